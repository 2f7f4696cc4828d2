//! Postman collections and `OpenAPI` specs as MCP tools.
//!
//! Startup loads every configured document into a [`catalog::Catalog`] (one tool per document)
//! and the baseline variables into a [`VariableScopeStore`]. The [`engine::Engine`] answers tool
//! calls; [`server`] exposes it over stdio or streamable HTTP.

pub mod catalog;
pub mod client_config;
pub mod config;
pub mod engine;
pub mod error;
pub mod server;

use crate::catalog::Catalog;
use crate::config::AdapterConfig;
use crate::engine::Engine;
use crate::error::map_env_error;
use postman_mcp_env::{VariableScopeStore, load_environment};
use postman_mcp_http_tools::runtime::ReqwestTransport;
use postman_mcp_http_tools::template::VarMap;
use std::sync::Arc;

/// Load the baseline and every document. Nothing here is fatal: a missing or broken environment
/// file yields an empty baseline and broken documents are skipped.
pub async fn build_engine(config: &AdapterConfig) -> Engine {
    let baseline = match &config.environment {
        Some(path) => load_environment(path).unwrap_or_else(|e| {
            tracing::warn!(error = %map_env_error(e), "Continuing with empty baseline variables");
            VarMap::new()
        }),
        None => VarMap::new(),
    };

    let client = reqwest::Client::new();
    let catalog = Catalog::load(config, &client).await;
    Engine::new(
        catalog,
        VariableScopeStore::new(baseline),
        Arc::new(ReqwestTransport::new(client)),
        config.token_var.clone(),
    )
}
