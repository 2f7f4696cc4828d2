//! MCP surface: `ServerHandler` over the call engine, served on stdio or streamable HTTP.

use crate::engine::Engine;
use crate::error::{AdapterError, Result};
use axum::Router;
use axum::routing::get;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ErrorData, RoleServer, ServerHandler, serve_server};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

const SESSION_HEADER: &str = "mcp-session-id";

const SERVER_INSTRUCTIONS: &str = r"Each API tool fronts one Postman collection or OpenAPI spec.
Call it with `endpoint` set to one of the identifiers listed in its description.

- `{{name}}` placeholders in URLs, headers, query and bodies are filled from variables:
  environment < global < session < the call's `vars`.
- `headers` / `query` add to or replace the endpoint's own values; `url` replaces the URL.
- `body`: a string is sent as-is; an object or array is sent as JSON (form fields for multipart endpoints).
- `set_vars` stores variables for later calls (`scope`: session or global); `set_token` stores a credential.
- Failed requests return `HTTP <status>: <body>`.";

#[derive(Clone)]
pub struct PostmanMcpServer {
    engine: Arc<Engine>,
}

impl PostmanMcpServer {
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// The streamable HTTP session of the request, if any. Stdio requests carry none.
fn session_id(context: &RequestContext<RoleServer>) -> Option<String> {
    context
        .extensions
        .get::<axum::http::request::Parts>()
        .and_then(|parts| parts.headers.get(SESSION_HEADER))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl ServerHandler for PostmanMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.engine.list_tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, ErrorData>> + Send + '_ {
        let session = session_id(&context);
        async move {
            let arguments = request.arguments.unwrap_or_default();
            self.engine
                .call_tool(&request.name, arguments, session.as_deref())
                .await
        }
    }
}

/// Serve on stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the MCP handshake or the transport fails.
pub async fn serve_stdio(engine: Arc<Engine>) -> Result<()> {
    let server = PostmanMcpServer::new(engine);
    let running = serve_server(server, rmcp::transport::io::stdio())
        .await
        .map_err(|e| AdapterError::Startup(format!("stdio MCP handshake failed: {e}")))?;
    running
        .waiting()
        .await
        .map_err(|e| AdapterError::Runtime(format!("stdio MCP service failed: {e}")))?;
    Ok(())
}

/// The HTTP app: MCP at `/mcp`, liveness at `/health`.
#[must_use]
pub fn router(engine: Arc<Engine>) -> Router {
    let server = PostmanMcpServer::new(engine);
    let service: StreamableHttpService<PostmanMcpServer, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(server.clone()),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig::default(),
        );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service)
}

/// Serve streamable HTTP on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve_http(engine: Arc<Engine>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AdapterError::Startup(format!("failed to bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "Serving MCP over streamable HTTP at /mcp");
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use postman_mcp_env::VariableScopeStore;
    use postman_mcp_http_tools::runtime::ReqwestTransport;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::new(
            Catalog::default(),
            VariableScopeStore::default(),
            Arc::new(ReqwestTransport::default()),
            "token",
        ))
    }

    #[test]
    fn info_advertises_tools() {
        let info = PostmanMcpServer::new(engine()).get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "postman-mcp-adapter");
        assert!(info.instructions.is_some_and(|i| i.contains("set_vars")));
    }

    #[tokio::test]
    async fn health_route_answers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router(engine())).await;
        });

        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .expect("get")
            .text()
            .await
            .expect("text");
        assert_eq!(body, "ok");
        server.abort();
    }
}
