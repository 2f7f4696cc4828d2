//! Call engine: routes tool calls to the variable store or to an endpoint request.
//!
//! Endpoint calls run `merge_call_vars -> synthesize -> transport -> normalize_response`. Any
//! failure past argument parsing becomes an `is_error` tool result for that call only.

use crate::catalog::{Catalog, DocumentTool};
use crate::error::{AdapterError, Result, map_http_tools_error};
use postman_mcp_env::{ScopeKind, VarUpdate, VariableScopeStore};
use postman_mcp_http_tools::runtime::{HttpTransport, normalize_response};
use postman_mcp_http_tools::synth::{BodyOverride, CallOverrides, synthesize};
use postman_mcp_http_tools::template::{VarMap, value_to_string};
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const SET_VARS_TOOL: &str = "set_vars";
pub const SET_TOKEN_TOOL: &str = "set_token";

/// Arguments of a document tool. Unrecognised keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointCallArgs {
    pub endpoint: String,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub query: Option<Map<String, Value>>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub vars: Option<Map<String, Value>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVarsArgs {
    #[serde(default)]
    pub vars: Option<Map<String, Value>>,
    #[serde(default)]
    pub clear: Option<Vec<String>>,
    #[serde(default)]
    pub reset_to_environment: Option<bool>,
    #[serde(default)]
    pub scope: Option<ScopeKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetTokenArgs {
    pub token: String,
    #[serde(default)]
    pub scope: Option<ScopeKind>,
}

pub struct Engine {
    catalog: Catalog,
    scopes: VariableScopeStore,
    transport: Arc<dyn HttpTransport>,
    token_var: String,
}

impl Engine {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        scopes: VariableScopeStore,
        transport: Arc<dyn HttpTransport>,
        token_var: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            scopes,
            transport,
            token_var: token_var.into(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Document tools in configuration order, then `set_vars` and `set_token`.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.catalog.iter().map(|t| t.tool().clone()).collect();
        tools.push(set_vars_tool());
        tools.push(set_token_tool(&self.token_var));
        tools
    }

    /// Dispatch one `tools/call`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_params` for unknown tool names and for arguments with missing or mistyped
    /// fields. Everything else is reported in the returned result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        session_id: Option<&str>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match name {
            SET_VARS_TOOL => Ok(self.set_vars(parse_args(name, arguments)?, session_id)),
            SET_TOKEN_TOOL => Ok(self.set_token(parse_args(name, arguments)?, session_id)),
            _ => {
                let Some(tool) = self.catalog.get(name) else {
                    return Err(ErrorData::invalid_params(format!("Unknown tool '{name}'"), None));
                };
                let args: EndpointCallArgs = parse_args(name, arguments)?;
                let endpoint = args.endpoint.clone();
                match self.call_endpoint(tool, args, session_id).await {
                    Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
                    Err(e) => {
                        tracing::warn!(
                            tool = %tool.name,
                            endpoint = %endpoint,
                            error = %e,
                            "Endpoint call failed"
                        );
                        Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
                    }
                }
            }
        }
    }

    /// Issue one endpoint request and render its response.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown endpoints, synthesis failures, transport failures and non-2xx
    /// responses (`HTTP <status>: <body>`).
    pub async fn call_endpoint(
        &self,
        tool: &DocumentTool,
        args: EndpointCallArgs,
        session_id: Option<&str>,
    ) -> Result<String> {
        let Some(endpoint) = tool.endpoint(&args.endpoint) else {
            return Err(AdapterError::UnknownEndpoint {
                tool: tool.name.clone(),
                endpoint: args.endpoint,
            });
        };

        let call_vars: VarMap = string_pairs(args.vars).into_iter().collect();
        let vars = self
            .scopes
            .merge_call_vars(session_id, &tool.document.defaults, &call_vars);
        let overrides = CallOverrides {
            url: args.url,
            headers: string_pairs(args.headers),
            query: string_pairs(args.query),
            body: args.body.and_then(BodyOverride::from_value),
        };

        let request = synthesize(
            endpoint,
            tool.document.base_url.as_deref(),
            &vars,
            &overrides,
        )?;
        tracing::debug!(
            tool = %tool.name,
            endpoint = %endpoint.identifier,
            method = %request.method,
            session = session_id.unwrap_or("-"),
            "Calling endpoint"
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(map_http_tools_error)?;
        normalize_response(&response).map_err(map_http_tools_error)
    }

    /// Apply a `set_vars` update. A call that changes nothing is reported as an error result.
    #[must_use]
    pub fn set_vars(&self, args: SetVarsArgs, session_id: Option<&str>) -> CallToolResult {
        let kind = args.scope.unwrap_or_default();
        let update = VarUpdate {
            reset_to_baseline: args.reset_to_environment.unwrap_or(false),
            clear: args.clear.unwrap_or_default(),
            set: string_pairs(args.vars).into_iter().collect(),
        };
        if update.is_noop() {
            return CallToolResult::error(vec![Content::text(
                "No variables provided. Specify at least vars, clear or resetToEnvironment.",
            )]);
        }

        self.scopes.apply(kind.target(session_id), &update);
        tracing::debug!(
            scope = kind.as_str(),
            session = session_id.unwrap_or("-"),
            set = update.set.len(),
            cleared = update.clear.len(),
            reset = update.reset_to_baseline,
            "Updated variables"
        );

        let reset = if update.reset_to_baseline {
            " (reset from environment)"
        } else {
            ""
        };
        let message = format!(
            "Set {} variables in scope {}{reset}.",
            update.set.len(),
            kind.as_str()
        );
        CallToolResult::success(vec![Content::text(message)])
    }

    /// Store `token` under the configured credential variable.
    #[must_use]
    pub fn set_token(&self, args: SetTokenArgs, session_id: Option<&str>) -> CallToolResult {
        let token = args.token.trim();
        if token.is_empty() {
            return CallToolResult::error(vec![Content::text("token must not be empty")]);
        }
        let kind = args.scope.unwrap_or_default();
        let update = VarUpdate {
            set: VarMap::from([(self.token_var.clone(), token.to_string())]),
            ..VarUpdate::default()
        };
        self.scopes.apply(kind.target(session_id), &update);
        let message = format!("Set {} in scope {}.", self.token_var, kind.as_str());
        CallToolResult::success(vec![Content::text(message)])
    }
}

fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: JsonObject,
) -> std::result::Result<T, ErrorData> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| {
        ErrorData::invalid_params(format!("Invalid arguments for '{tool}': {e}"), None)
    })
}

fn string_pairs(map: Option<Map<String, Value>>) -> Vec<(String, String)> {
    map.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, value_to_string(&v)))
        .collect()
}

fn set_vars_tool() -> Tool {
    let schema = json!({
        "type": "object",
        "properties": {
            "vars": {
                "type": "object",
                "additionalProperties": {"type": "string"},
                "description": "Variables to set"
            },
            "clear": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Variable names to remove"
            },
            "resetToEnvironment": {
                "type": "boolean",
                "description": "Restore the environment values before clearing and setting"
            },
            "scope": {
                "type": "string",
                "enum": ["session", "global"],
                "description": "Target bag (default: session; global when there is no session)"
            }
        }
    });
    Tool::new(
        SET_VARS_TOOL,
        "Set default variables (session or global scope) reused by later calls.",
        Arc::new(object(schema)),
    )
}

fn set_token_tool(token_var: &str) -> Tool {
    let schema = json!({
        "type": "object",
        "properties": {
            "token": {"type": "string", "description": "Credential value"},
            "scope": {"type": "string", "enum": ["session", "global"]}
        },
        "required": ["token"]
    });
    Tool::new(
        SET_TOKEN_TOOL,
        format!("Store a credential in the '{token_var}' variable for later calls."),
        Arc::new(object(schema)),
    )
}

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(obj) => obj,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CompiledDocument, DocumentKind};
    use async_trait::async_trait;
    use postman_mcp_http_tools::endpoint::{BodySpec, EndpointDescriptor, HttpMethod};
    use postman_mcp_http_tools::runtime::{HttpToolsError, TransportResponse};
    use postman_mcp_http_tools::synth::OutboundRequest;
    use std::sync::Mutex;

    struct Canned {
        status: u16,
        content_type: &'static str,
        body: &'static str,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Canned {
        async fn send(
            &self,
            request: OutboundRequest,
        ) -> postman_mcp_http_tools::runtime::Result<TransportResponse> {
            self.seen.lock().expect("lock").push(request);
            Ok(TransportResponse {
                status: self.status,
                headers: vec![("Content-Type".to_string(), self.content_type.to_string())],
                body: self.body.to_string(),
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl HttpTransport for Unreachable {
        async fn send(
            &self,
            _request: OutboundRequest,
        ) -> postman_mcp_http_tools::runtime::Result<TransportResponse> {
            Err(HttpToolsError::Transport("connection refused".to_string()))
        }
    }

    fn canned(status: u16, content_type: &'static str, body: &'static str) -> Arc<Canned> {
        Arc::new(Canned {
            status,
            content_type,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn engine(transport: Arc<dyn HttpTransport>, base_url: Option<&str>) -> Engine {
        let doc = CompiledDocument {
            key: "shop".to_string(),
            label: "Shop".to_string(),
            kind: DocumentKind::Collection,
            base_url: base_url.map(str::to_string),
            defaults: VarMap::from([("region".to_string(), "eu".to_string())]),
            endpoints: vec![EndpointDescriptor {
                identifier: "orders_get".to_string(),
                display_name: "Orders".to_string(),
                method: HttpMethod::Get,
                url_template: "/{{region}}/orders".to_string(),
                headers: vec![(
                    "Authorization".to_string(),
                    "Bearer {{token}}".to_string(),
                )],
                query: Vec::new(),
                body: BodySpec::None,
                description: None,
            }],
        };
        let baseline = VarMap::from([("token".to_string(), "env-token".to_string())]);
        Engine::new(
            Catalog::new(vec![doc]),
            VariableScopeStore::new(baseline),
            transport,
            "token",
        )
    }

    fn args(value: Value) -> JsonObject {
        object(value)
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn lists_document_tools_then_builtins() {
        let engine = engine(canned(200, "text/plain", ""), None);
        let names: Vec<String> = engine
            .list_tools()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["shop", "set_vars", "set_token"]);
    }

    #[tokio::test]
    async fn endpoint_call_merges_scopes_and_renders_json() {
        let transport = canned(200, "application/json", r#"{"ok":true}"#);
        let engine = engine(transport.clone(), Some("https://shop.test/api/"));

        let result = engine
            .call_tool(
                "shop",
                args(json!({
                    "endpoint": "orders_get",
                    "query": {"page": 2},
                    "vars": {"region": "us"}
                })),
                None,
            )
            .await
            .expect("call");
        assert_eq!(result.is_error, Some(false));
        assert_eq!(text(&result), "{\n  \"ok\": true\n}");

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(
            seen[0].url.as_str(),
            "https://shop.test/api/us/orders?page=2"
        );
        assert_eq!(seen[0].header("authorization"), Some("Bearer env-token"));
    }

    #[tokio::test]
    async fn call_failures_are_error_results() {
        let engine_404 = engine(
            canned(404, "application/json", r#"{"error":"nope"}"#),
            Some("https://shop.test"),
        );
        let result = engine_404
            .call_tool("shop", args(json!({"endpoint": "orders_get"})), None)
            .await
            .expect("call");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), "HTTP 404: {\n  \"error\": \"nope\"\n}");

        let no_base = engine(canned(200, "text/plain", "ok"), None);
        let result = no_base
            .call_tool("shop", args(json!({"endpoint": "orders_get"})), None)
            .await
            .expect("call");
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("unresolved relative URL"));

        let result = no_base
            .call_tool("shop", args(json!({"endpoint": "missing"})), None)
            .await
            .expect("call");
        assert_eq!(text(&result), "Unknown endpoint 'missing' for tool 'shop'");

        let offline = engine(Arc::new(Unreachable), Some("https://shop.test"));
        let result = offline
            .call_tool("shop", args(json!({"endpoint": "orders_get"})), None)
            .await
            .expect("call");
        assert_eq!(text(&result), "transport error: connection refused");
    }

    #[tokio::test]
    async fn protocol_misuse_is_invalid_params() {
        let engine = engine(canned(200, "text/plain", ""), None);
        assert!(
            engine
                .call_tool("nope", JsonObject::new(), None)
                .await
                .is_err()
        );
        assert!(
            engine
                .call_tool("shop", JsonObject::new(), None)
                .await
                .is_err()
        );
        assert!(
            engine
                .call_tool(SET_VARS_TOOL, args(json!({"scope": "tenant"})), None)
                .await
                .is_err()
        );
        assert!(
            engine
                .call_tool(SET_TOKEN_TOOL, JsonObject::new(), None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn unrecognised_argument_keys_are_ignored() {
        let transport = canned(200, "text/plain", "ok");
        let engine = engine(transport.clone(), Some("https://shop.test"));

        let result = engine
            .call_tool(
                "shop",
                args(json!({"endpoint": "orders_get", "trace": true})),
                None,
            )
            .await
            .expect("call");
        assert_eq!(result.is_error, Some(false));
        assert_eq!(transport.seen.lock().expect("lock").len(), 1);

        let result = engine
            .call_tool(
                SET_VARS_TOOL,
                args(json!({"vars": {"a": "1"}, "note": "x"})),
                Some("s1"),
            )
            .await
            .expect("set_vars");
        assert_eq!(result.is_error, Some(false));

        let result = engine
            .call_tool(
                SET_TOKEN_TOOL,
                args(json!({"token": "t", "ttl": 60})),
                Some("s1"),
            )
            .await
            .expect("set_token");
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn set_vars_reports_noop_and_applies_in_order() {
        let engine = engine(canned(200, "text/plain", ""), None);

        let noop = engine.set_vars(SetVarsArgs::default(), Some("s1"));
        assert_eq!(noop.is_error, Some(true));
        assert!(text(&noop).starts_with("No variables provided"));

        let result = engine.set_vars(
            SetVarsArgs {
                vars: Some(object(json!({"token": "fresh", "n": 1}))),
                clear: Some(vec!["token".to_string()]),
                reset_to_environment: Some(true),
                scope: None,
            },
            Some("s1"),
        );
        assert_eq!(
            text(&result),
            "Set 2 variables in scope session (reset from environment)."
        );

        let bag = engine.scopes.read(Some("s1"));
        assert_eq!(bag.get("token").map(String::as_str), Some("fresh"));
        assert_eq!(bag.get("n").map(String::as_str), Some("1"));
        assert_eq!(
            engine.scopes.read(None).get("token").map(String::as_str),
            Some("env-token")
        );
    }

    #[test]
    fn set_token_writes_the_configured_variable() {
        let engine = engine(canned(200, "text/plain", ""), None);
        let result = engine.set_token(
            SetTokenArgs {
                token: " abc ".to_string(),
                scope: Some(ScopeKind::Global),
            },
            Some("s1"),
        );
        assert_eq!(text(&result), "Set token in scope global.");
        assert_eq!(
            engine.scopes.read(None).get("token").map(String::as_str),
            Some("abc")
        );

        let empty = engine.set_token(
            SetTokenArgs {
                token: "  ".to_string(),
                scope: None,
            },
            None,
        );
        assert_eq!(empty.is_error, Some(true));
    }
}
