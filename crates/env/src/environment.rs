//! Postman environment documents (`{ "name": ..., "values": [{ key, value, enabled }] }`).

use crate::error::{EnvError, Result};
use postman_mcp_http_tools::template::{VarMap, value_to_string};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct EnvironmentDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    values: Vec<Value>,
}

/// Load the enabled key/value pairs of a Postman environment file.
///
/// Entries without a key or with `"enabled": false` are skipped. Non-string values are coerced
/// to strings (`null` becomes empty).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON object.
pub fn load_environment(path: &Path) -> Result<VarMap> {
    let raw = std::fs::read_to_string(path).map_err(|source| EnvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: EnvironmentDocument = serde_json::from_str(&raw).map_err(|source| EnvError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let vars = environment_values(&doc.values);
    tracing::info!(
        path = %path.display(),
        name = doc.name.as_deref().unwrap_or(""),
        variables = vars.len(),
        "Loaded Postman environment"
    );
    Ok(vars)
}

fn environment_values(values: &[Value]) -> VarMap {
    let mut out = VarMap::new();
    for entry in values {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let Some(key) = obj
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
        else {
            continue;
        };
        if obj.get("enabled").and_then(Value::as_bool) == Some(false) {
            continue;
        }
        let value = obj.get("value").map(value_to_string).unwrap_or_default();
        out.insert(key.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_enabled_values_and_coerces_scalars() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("env.json");
        let doc = json!({
            "name": "Local",
            "values": [
                {"key": "baseUrl", "value": "https://api.test", "enabled": true},
                {"key": "retries", "value": 3},
                {"key": "flag", "value": true},
                {"key": "empty", "value": null},
                {"key": "off", "value": "x", "enabled": false},
                {"value": "keyless"},
                {"key": "", "value": "blank key"},
                "not an object"
            ]
        });
        std::fs::write(&path, doc.to_string()).expect("write");

        let vars = load_environment(&path).expect("load");
        assert_eq!(vars.len(), 4);
        assert_eq!(
            vars.get("baseUrl").map(String::as_str),
            Some("https://api.test")
        );
        assert_eq!(vars.get("retries").map(String::as_str), Some("3"));
        assert_eq!(vars.get("flag").map(String::as_str), Some("true"));
        assert_eq!(vars.get("empty").map(String::as_str), Some(""));
        assert!(!vars.contains_key("off"));
    }

    #[test]
    fn missing_values_array_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("env.json");
        std::fs::write(&path, r#"{"name":"x"}"#).expect("write");
        assert!(load_environment(&path).expect("load").is_empty());
    }

    #[test]
    fn unreadable_and_malformed_files_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_environment(&missing), Err(EnvError::Io { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").expect("write");
        assert!(matches!(load_environment(&bad), Err(EnvError::Parse { .. })));
    }
}
