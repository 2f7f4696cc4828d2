//! Path-keyed API specifications (`OpenAPI` 3.x, Swagger 2.0) as endpoint tables.
//!
//! Documents are walked as generic JSON so partially broken specs still yield every operation
//! that can be understood; the rest is skipped with a warning.

pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod resolver;

pub use config::ApiSpecConfig;
pub use error::{OpenApiToolsError, Result};
pub use loader::{OpenApiDocument, SpecLocation, load_openapi_document};
pub use normalize::normalize_paths;
