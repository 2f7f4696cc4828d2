//! Error types for `postman-mcp-collection-tools`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("failed to read collection file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse collection '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but is not a collection object.
    #[error("invalid collection '{path}': {message}")]
    Invalid { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CollectionError>;
