//! `--print-client-config`: an `mcpServers` entry that launches this binary with the resolved
//! documents, all paths absolute.

use crate::config::{AdapterConfig, ENVIRONMENT_FILE_KEY, TransportMode};
use serde_json::{Map, Value, json};
use std::path::Path;

pub const SERVER_NAME: &str = "postman-mcp";
const DEFAULT_TOKEN_VAR: &str = "token";

#[must_use]
pub fn client_config(config: &AdapterConfig, command: &Path) -> Value {
    let mut env = Map::new();
    if let Some(path) = &config.environment {
        env.insert(
            ENVIRONMENT_FILE_KEY.to_string(),
            Value::String(path.display().to_string()),
        );
    }

    let mut collection_keys: Vec<&str> = Vec::new();
    for source in &config.collections {
        if !collection_keys.contains(&source.key.as_str()) {
            collection_keys.push(&source.key);
        }
    }
    for key in collection_keys {
        let paths: Vec<String> = config
            .collections
            .iter()
            .filter(|c| c.key == key)
            .map(|c| c.path.display().to_string())
            .collect();
        env.insert(
            format!("{}_PATH", env_key(key)),
            Value::String(paths.join(",")),
        );
    }
    for spec in &config.openapi {
        env.insert(
            format!("{}_OPENAPI", env_key(&spec.name)),
            Value::String(spec.spec.clone()),
        );
    }

    if !config.base_urls.is_empty() {
        let entries: Vec<String> = config
            .base_urls
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        env.insert(
            "POSTMAN_MCP_BASE_URLS".to_string(),
            Value::String(entries.join(";")),
        );
    }
    if config.token_var != DEFAULT_TOKEN_VAR {
        env.insert(
            "POSTMAN_MCP_TOKEN_VAR".to_string(),
            Value::String(config.token_var.clone()),
        );
    }

    let args: Vec<String> = match config.transport {
        TransportMode::Stdio => Vec::new(),
        TransportMode::Http => vec![
            "--transport".to_string(),
            "http".to_string(),
            "--bind".to_string(),
            config.bind.to_string(),
        ],
    };

    json!({
        "mcpServers": {
            SERVER_NAME: {
                "command": command.display().to_string(),
                "args": args,
                "env": env,
            }
        }
    })
}

/// `my-api` -> `MY_API`.
fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
