//! Document catalog: one MCP tool per loaded document.
//!
//! Built once at startup and read-only afterwards.

use crate::config::AdapterConfig;
use crate::engine::{SET_TOKEN_TOOL, SET_VARS_TOOL};
use crate::error::{map_collection_error, map_openapi_tools_error};
use postman_mcp_collection_tools::{CollectionDocument, load_collection};
use postman_mcp_http_tools::endpoint::EndpointDescriptor;
use postman_mcp_http_tools::naming::{IdentifierAllocator, slug};
use postman_mcp_http_tools::semantics::annotations_for_methods;
use postman_mcp_http_tools::template::VarMap;
use postman_mcp_openapi_tools::{OpenApiDocument, load_openapi_document};
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Identifiers listed in a tool description before it is cut off.
const DESCRIPTION_PREVIEW: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Collection,
    OpenApi,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Collection => "collection",
            DocumentKind::OpenApi => "spec",
        })
    }
}

/// A loaded source document reduced to what calls need.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    /// Configuration key; the tool name is derived from it.
    pub key: String,
    pub label: String,
    pub kind: DocumentKind,
    /// Joined with relative endpoint URLs.
    pub base_url: Option<String>,
    /// Lowest-priority variables (collection `variable[]`).
    pub defaults: VarMap,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl CompiledDocument {
    #[must_use]
    pub fn from_collection(key: &str, doc: CollectionDocument, base_url: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            label: doc.label,
            kind: DocumentKind::Collection,
            base_url: base_url.map(str::to_string),
            defaults: doc.variables,
            endpoints: doc.endpoints,
        }
    }

    #[must_use]
    pub fn from_openapi(doc: OpenApiDocument) -> Self {
        Self {
            key: doc.name,
            label: doc.label,
            kind: DocumentKind::OpenApi,
            base_url: doc.base_url,
            defaults: VarMap::new(),
            endpoints: doc.endpoints,
        }
    }
}

/// One registered document tool.
#[derive(Debug)]
pub struct DocumentTool {
    pub name: String,
    pub document: CompiledDocument,
    tool: Tool,
}

impl DocumentTool {
    fn new(name: String, document: CompiledDocument) -> Self {
        let ids: Vec<&str> = document
            .endpoints
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        let preview = ids
            .iter()
            .take(DESCRIPTION_PREVIEW)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let suffix = if ids.len() > DESCRIPTION_PREVIEW {
            ", ..."
        } else {
            ""
        };
        let description = format!(
            "API calls from {} \"{}\" ({} endpoints): {preview}{suffix}",
            document.kind,
            document.label,
            ids.len()
        );

        let mut tool = Tool::new(name.clone(), description, Arc::new(input_schema(&ids)));
        tool.annotations = Some(annotations_for_methods(
            document.endpoints.iter().map(|e| e.method),
        ));

        Self {
            name,
            document,
            tool,
        }
    }

    #[must_use]
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    #[must_use]
    pub fn endpoint(&self, identifier: &str) -> Option<&EndpointDescriptor> {
        self.document
            .endpoints
            .iter()
            .find(|e| e.identifier == identifier)
    }
}

fn input_schema(ids: &[&str]) -> JsonObject {
    let string_map = json!({"type": "object", "additionalProperties": {"type": "string"}});
    let mut headers = string_map.clone();
    headers["description"] = json!("Headers added to (or replacing) the endpoint's headers");
    let mut query = string_map.clone();
    query["description"] =
        json!("Query parameters added to (or replacing) the endpoint's query");
    let mut vars = string_map;
    vars["description"] =
        json!("Variables for this call only; highest priority for {{var}} expansion");

    let schema = json!({
        "type": "object",
        "properties": {
            "endpoint": {
                "type": "string",
                "enum": ids,
                "description": "Endpoint identifier"
            },
            "headers": headers,
            "query": query,
            "body": {
                "description": "Body override. Strings are sent verbatim after {{var}} expansion; objects and arrays are sent as JSON, or as form fields for multipart endpoints",
                "anyOf": [{"type": "string"}, {"type": "object"}, {"type": "array"}]
            },
            "vars": vars,
            "url": {
                "type": "string",
                "description": "Absolute URL replacing the endpoint URL (query parameters still apply)"
            }
        },
        "required": ["endpoint"]
    });
    match schema {
        Value::Object(obj) => obj,
        _ => JsonObject::new(),
    }
}

/// All document tools in configuration order.
#[derive(Debug, Default)]
pub struct Catalog {
    tools: Vec<Arc<DocumentTool>>,
}

impl Catalog {
    /// Register one tool per document with at least one endpoint.
    ///
    /// Tool names are slugs of the document keys, made unique with `_2`, `_3`, ... and never equal
    /// to the built-in variable tools.
    #[must_use]
    pub fn new(documents: Vec<CompiledDocument>) -> Self {
        let mut names = IdentifierAllocator::new();
        names.reserve(SET_VARS_TOOL);
        names.reserve(SET_TOKEN_TOOL);

        let mut tools = Vec::new();
        for document in documents {
            if document.endpoints.is_empty() {
                tracing::info!(
                    document = %document.key,
                    label = %document.label,
                    "Document has no endpoints; no tool registered"
                );
                continue;
            }
            let mut base = slug(&[document.key.as_str()]);
            if base.is_empty() {
                base = document.kind.to_string();
            }
            let name = names.allocate(&base);
            tracing::info!(
                tool = %name,
                document = %document.label,
                endpoints = document.endpoints.len(),
                "Registered document tool"
            );
            tools.push(Arc::new(DocumentTool::new(name, document)));
        }
        Self { tools }
    }

    /// Load every configured document. A document that fails to load is skipped with a warning.
    pub async fn load(config: &AdapterConfig, client: &reqwest::Client) -> Self {
        let mut documents = Vec::new();

        for source in &config.collections {
            match load_collection(&source.path).map_err(map_collection_error) {
                Ok(doc) => documents.push(CompiledDocument::from_collection(
                    &source.key,
                    doc,
                    config.base_url_for(&source.key),
                )),
                Err(e) => tracing::warn!(
                    document = %source.key,
                    path = %source.path.display(),
                    error = %e,
                    "Skipping collection"
                ),
            }
        }

        for spec in &config.openapi {
            match load_openapi_document(spec, client, config.startup_timeout)
                .await
                .map_err(map_openapi_tools_error)
            {
                Ok(doc) => documents.push(CompiledDocument::from_openapi(doc)),
                Err(e) => tracing::warn!(
                    document = %spec.name,
                    location = %spec.spec,
                    error = %e,
                    "Skipping OpenAPI spec"
                ),
            }
        }

        let catalog = Self::new(documents);
        if catalog.is_empty() {
            tracing::warn!("No documents loaded: no API tools will be exposed");
        }
        catalog
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<DocumentTool>> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DocumentTool>> {
        self.tools.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
