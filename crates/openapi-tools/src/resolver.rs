//! Local `$ref` resolver.
//!
//! Specs are walked as generic JSON, so a `$ref` is any object carrying a string `$ref` member.
//! Only same-document references (`#/...`) are followed; anything else is reported to the caller,
//! which skips the element that needed it.

use crate::error::{OpenApiToolsError, Result};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct LocalRefResolver<'a> {
    root: &'a Value,
}

impl<'a> LocalRefResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Follow `$ref` chains starting at `value` until a non-reference value is reached.
    ///
    /// # Errors
    ///
    /// Returns an error for external or malformed references, missing targets, and cycles.
    pub fn resolve(&self, value: &'a Value) -> Result<&'a Value> {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut cur = value;
        while let Some(reference) = ref_target(cur) {
            if !seen.insert(reference) {
                return Err(OpenApiToolsError::OpenApi(format!(
                    "Cyclic $ref detected while resolving: {reference}",
                )));
            }
            cur = self.lookup(reference)?;
        }
        Ok(cur)
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value> {
        let Some(fragment) = reference.strip_prefix('#') else {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Unsupported external $ref '{reference}' (only '#/...' references are resolved)",
            )));
        };
        if fragment.is_empty() {
            return Ok(self.root);
        }
        if !fragment.starts_with('/') {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Unsupported $ref fragment (expected JSON pointer starting with '/'): {reference}",
            )));
        }
        self.root.pointer(fragment).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!(
                "Unresolved $ref '{reference}' (missing pointer '{fragment}')"
            ))
        })
    }
}

fn ref_target(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> Value {
        json!({
            "components": {
                "parameters": {
                    "Limit": {"name": "limit", "in": "query"},
                    "Alias": {"$ref": "#/components/parameters/Limit"},
                    "LoopA": {"$ref": "#/components/parameters/LoopB"},
                    "LoopB": {"$ref": "#/components/parameters/LoopA"}
                },
                "schemas": {
                    "a~b": {"type": "string"},
                    "a/b": {"type": "integer"}
                }
            }
        })
    }

    #[test]
    fn follows_chains_to_the_target() {
        let root = spec();
        let resolver = LocalRefResolver::new(&root);
        let r = json!({"$ref": "#/components/parameters/Alias"});
        let resolved = resolver.resolve(&r).expect("resolve");
        assert_eq!(resolved["name"], "limit");

        let plain = json!({"name": "x"});
        assert_eq!(resolver.resolve(&plain).expect("plain"), &plain);
    }

    #[test]
    fn pointer_escapes_are_honoured() {
        let root = spec();
        let resolver = LocalRefResolver::new(&root);
        let tilde = json!({"$ref": "#/components/schemas/a~0b"});
        assert_eq!(resolver.resolve(&tilde).expect("tilde")["type"], "string");
        let slash = json!({"$ref": "#/components/schemas/a~1b"});
        assert_eq!(resolver.resolve(&slash).expect("slash")["type"], "integer");
    }

    #[test]
    fn cycles_missing_and_external_refs_are_errors() {
        let root = spec();
        let resolver = LocalRefResolver::new(&root);

        let cyclic = json!({"$ref": "#/components/parameters/LoopA"});
        let err = resolver.resolve(&cyclic).unwrap_err();
        assert!(err.to_string().contains("Cyclic"));

        let missing = json!({"$ref": "#/components/parameters/Nope"});
        let err = resolver.resolve(&missing).unwrap_err();
        assert!(err.to_string().contains("Unresolved"));

        let external = json!({"$ref": "common.yaml#/components/parameters/Limit"});
        let err = resolver.resolve(&external).unwrap_err();
        assert!(err.to_string().contains("external"));

        let bad_fragment = json!({"$ref": "#components"});
        assert!(resolver.resolve(&bad_fragment).is_err());
    }
}
