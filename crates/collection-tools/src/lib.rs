//! Postman collection (v2.x) loading.
//!
//! A collection is a tree of items; every item carrying a `request` becomes one
//! [`EndpointDescriptor`](postman_mcp_http_tools::endpoint::EndpointDescriptor).

pub mod error;
pub mod loader;
pub mod normalize;

pub use error::{CollectionError, Result};
pub use loader::{CollectionDocument, load_collection, parse_collection};
pub use normalize::normalize_items;
