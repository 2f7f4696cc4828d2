//! `{{name}}` placeholder expansion.

use std::collections::HashMap;

use serde_json::Value;

/// Variable bag used for template expansion. Values are always strings.
pub type VarMap = HashMap<String, String>;

/// Expand every `{{name}}` placeholder in `text` whose trimmed name exists in `vars`.
///
/// Unknown placeholders are kept exactly as written (braces and inner whitespace included).
/// A placeholder body cannot contain `}` and cannot be empty.
#[must_use]
pub fn resolve(text: &str, vars: &VarMap) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match placeholder_len(after_open) {
            Some(len) => {
                let name = after_open[..len].trim();
                let original = &rest[start..start + 2 + len + 2];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(original),
                }
                rest = &rest[start + 2 + len + 2..];
            }
            None => {
                // Not a placeholder here; retry from the next character.
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholder_len(after_open: &str) -> Option<usize> {
    let close = after_open.find('}')?;
    if close == 0 || !after_open[close..].starts_with("}}") {
        return None;
    }
    Some(close)
}

/// Coerce a scalar JSON value to its variable-string form (`null` becomes empty).
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
