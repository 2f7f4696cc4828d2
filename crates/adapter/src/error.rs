//! Error types for the MCP adapter.

use postman_mcp_collection_tools::CollectionError;
use postman_mcp_env::EnvError;
use postman_mcp_http_tools::runtime::HttpToolsError;
use postman_mcp_http_tools::synth::SynthError;
use postman_mcp_openapi_tools::OpenApiToolsError;
use thiserror::Error;

/// Main error type for the adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Configuration errors (malformed `name=value` entries, unreadable env files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (listener bind, spec load timeouts)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Runtime errors
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Failed API calls. The message is already `HTTP <status>: <body>` or `transport error: ...`.
    #[error("{0}")]
    Http(String),

    /// `OpenAPI` errors (spec fetch, parsing)
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Collection errors (read, parse)
    #[error("Collection error: {0}")]
    Collection(String),

    /// Baseline environment errors
    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Unknown endpoint '{endpoint}' for tool '{tool}'")]
    UnknownEndpoint { tool: String, endpoint: String },

    /// Request synthesis errors (relative URL without base, invalid URLs)
    #[error(transparent)]
    Synth(#[from] SynthError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

pub(crate) fn map_http_tools_error(e: HttpToolsError) -> AdapterError {
    match e {
        HttpToolsError::Config(s) => AdapterError::Config(s),
        e @ (HttpToolsError::Status { .. } | HttpToolsError::Transport(_)) => {
            AdapterError::Http(e.to_string())
        }
    }
}

pub(crate) fn map_openapi_tools_error(e: OpenApiToolsError) -> AdapterError {
    match e {
        OpenApiToolsError::Startup(s) => AdapterError::Startup(s),
        OpenApiToolsError::OpenApi(s) => AdapterError::OpenApi(s),
        OpenApiToolsError::OpenApiSpecFetch { url, message } => {
            AdapterError::OpenApi(format!("failed to fetch spec from '{url}': {message}"))
        }
        OpenApiToolsError::OpenApiSpecReadBody { url, message } => {
            AdapterError::OpenApi(format!("failed to read spec body from '{url}': {message}"))
        }
        OpenApiToolsError::OpenApiSpecReadFile { path, source } => {
            AdapterError::OpenApi(format!("failed to read spec file '{path}': {source}"))
        }
        OpenApiToolsError::OpenApiSpecParse { location, source } => AdapterError::OpenApi(format!(
            "failed to parse OpenAPI spec from '{location}': {source}"
        )),
    }
}

pub(crate) fn map_collection_error(e: CollectionError) -> AdapterError {
    AdapterError::Collection(e.to_string())
}

pub(crate) fn map_env_error(e: EnvError) -> AdapterError {
    AdapterError::Environment(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failures_keep_their_message() {
        let e = map_http_tools_error(HttpToolsError::Status {
            status: 404,
            body: "not found".to_string(),
        });
        assert_eq!(e.to_string(), "HTTP 404: not found");

        let e = map_http_tools_error(HttpToolsError::Transport("connection refused".to_string()));
        assert_eq!(e.to_string(), "transport error: connection refused");
    }

    #[test]
    fn spec_errors_name_their_location() {
        let e = map_openapi_tools_error(OpenApiToolsError::OpenApiSpecFetch {
            url: "https://x.test/spec.json".to_string(),
            message: "timed out".to_string(),
        });
        assert!(matches!(e, AdapterError::OpenApi(_)));
        assert!(e.to_string().contains("https://x.test/spec.json"));
    }
}
