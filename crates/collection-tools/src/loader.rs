use crate::error::{CollectionError, Result};
use crate::normalize::normalize_items;
use postman_mcp_http_tools::endpoint::EndpointDescriptor;
use postman_mcp_http_tools::template::{VarMap, value_to_string};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One loaded collection, reduced to its endpoint table.
#[derive(Debug, Clone)]
pub struct CollectionDocument {
    /// `info.name`, else the file name.
    pub label: String,
    pub source: PathBuf,
    pub endpoints: Vec<EndpointDescriptor>,
    /// Collection-level `variable[]`, the lowest-priority layer at call time.
    pub variables: VarMap,
}

/// Read and normalize a collection file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not JSON, or is not a JSON object.
pub fn load_collection(path: &Path) -> Result<CollectionDocument> {
    let raw = std::fs::read_to_string(path).map_err(|source| CollectionError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let doc: Value = serde_json::from_str(&raw).map_err(|source| CollectionError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    let document = parse_collection(&doc, path)?;

    tracing::info!(
        collection = %document.label,
        path = %path.display(),
        endpoints = document.endpoints.len(),
        "Loaded Postman collection"
    );
    Ok(document)
}

/// Normalize an already-parsed collection document.
///
/// # Errors
///
/// Returns an error if `doc` is not a JSON object.
pub fn parse_collection(doc: &Value, source: &Path) -> Result<CollectionDocument> {
    let Some(obj) = doc.as_object() else {
        return Err(CollectionError::Invalid {
            path: source.display().to_string(),
            message: "top-level value is not an object".to_string(),
        });
    };

    let label = obj
        .get("info")
        .and_then(|i| i.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| source.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "collection".to_string());

    let endpoints = obj
        .get("item")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .map(normalize_items)
        .unwrap_or_default();

    Ok(CollectionDocument {
        label,
        source: source.to_path_buf(),
        endpoints,
        variables: collection_variables(obj.get("variable")),
    })
}

fn collection_variables(value: Option<&Value>) -> VarMap {
    let mut out = VarMap::new();
    let Some(entries) = value.and_then(Value::as_array) else {
        return out;
    };
    for entry in entries.iter().filter_map(Value::as_object) {
        if entry.get("disabled").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        let Some(key) = entry
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
        else {
            continue;
        };
        let value = entry.get("value").map(value_to_string).unwrap_or_default();
        out.insert(key.to_string(), value);
    }
    out
}
