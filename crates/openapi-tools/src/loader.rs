use crate::config::ApiSpecConfig;
use crate::error::{OpenApiToolsError, Result};
use crate::normalize::normalize_paths;
use postman_mcp_http_tools::endpoint::EndpointDescriptor;
use postman_mcp_http_tools::safety::sanitize_reqwest_error;
use postman_mcp_http_tools::template::value_to_string;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Where a spec comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecLocation {
    Url(Url),
    File(PathBuf),
}

impl SpecLocation {
    /// `http(s)://` locations are fetched, anything else is a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if an `http(s)` location is not a valid URL.
    pub fn parse(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| {
                OpenApiToolsError::OpenApi(format!("Invalid OpenAPI spec URL '{location}': {e}"))
            })?;
            return Ok(Self::Url(url));
        }
        Ok(Self::File(PathBuf::from(location)))
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One loaded spec, reduced to its endpoint table.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    /// Document key from configuration.
    pub name: String,
    /// `info.title`, else the document key.
    pub label: String,
    pub location: SpecLocation,
    pub base_url: Option<String>,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// Fetch or read the spec, parse it, and normalize its paths.
///
/// Remote fetches are bounded by `timeout`.
///
/// # Errors
///
/// Returns an error if the spec cannot be fetched/read within `timeout`, or does not parse.
pub async fn load_openapi_document(
    config: &ApiSpecConfig,
    client: &Client,
    timeout: Duration,
) -> Result<OpenApiDocument> {
    let location = SpecLocation::parse(&config.spec)?;
    let content = tokio::time::timeout(timeout, read_spec(&location, client))
        .await
        .map_err(|_| {
            OpenApiToolsError::Startup(format!(
                "Timed out after {}s loading OpenAPI spec '{location}'",
                timeout.as_secs()
            ))
        })??;

    // JSON is a subset of YAML, so one parser covers both.
    let doc: Value =
        serde_yaml::from_str(&content).map_err(|source| OpenApiToolsError::OpenApiSpecParse {
            location: location.to_string(),
            source,
        })?;
    if !doc.is_object() {
        return Err(OpenApiToolsError::OpenApi(format!("Spec '{location}' is not a mapping")));
    }

    let label = doc
        .get("info")
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| config.name.clone(), str::to_string);

    let base_url = match &config.base_url {
        Some(url) => Some(url.clone()),
        None => spec_base_url(&doc, &location),
    };
    if base_url.is_none() {
        tracing::warn!(
            document = %config.name,
            "No base URL for spec; relative endpoints need a 'url' override or an absolute server"
        );
    }

    let endpoints = normalize_paths(&doc);
    tracing::info!(
        document = %config.name,
        location = %location,
        endpoints = endpoints.len(),
        base_url = base_url.as_deref().unwrap_or("<none>"),
        "Loaded OpenAPI spec"
    );

    Ok(OpenApiDocument {
        name: config.name.clone(),
        label,
        location,
        base_url,
        endpoints,
    })
}

async fn read_spec(location: &SpecLocation, client: &Client) -> Result<String> {
    match location {
        SpecLocation::Url(url) => {
            tracing::info!(url = %url, "Fetching OpenAPI spec");
            let resp = client
                .get(url.clone())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| OpenApiToolsError::OpenApiSpecFetch {
                    url: url.to_string(),
                    message: sanitize_reqwest_error(&e),
                })?;
            resp.text()
                .await
                .map_err(|e| OpenApiToolsError::OpenApiSpecReadBody {
                    url: url.to_string(),
                    message: sanitize_reqwest_error(&e),
                })
        }
        SpecLocation::File(path) => {
            tracing::info!(path = %path.display(), "Loading OpenAPI spec");
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| OpenApiToolsError::OpenApiSpecReadFile {
                    path: path.display().to_string(),
                    source,
                })
        }
    }
}

/// `servers[0].url` with server variables substituted, or the Swagger 2.0 `host` triple.
fn spec_base_url(doc: &Value, location: &SpecLocation) -> Option<String> {
    if let Some(server) = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        && let Some(raw) = server.get("url").and_then(Value::as_str)
    {
        let url = substitute_server_variables(raw, server.get("variables"));
        return absolutize(&url, location);
    }

    let host = doc.get("host").and_then(Value::as_str)?;
    let scheme = doc
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = doc.get("basePath").and_then(Value::as_str).unwrap_or("");
    Some(format!("{scheme}://{host}{base_path}"))
}

fn substitute_server_variables(raw: &str, variables: Option<&Value>) -> String {
    let Some(variables) = variables.and_then(Value::as_object) else {
        return raw.to_string();
    };
    let mut url = raw.to_string();
    for (name, var) in variables {
        if let Some(default) = var.get("default") {
            url = url.replace(&format!("{{{name}}}"), &value_to_string(default));
        }
    }
    url
}

fn absolutize(url: &str, location: &SpecLocation) -> Option<String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    match location {
        SpecLocation::Url(spec_url) => match spec_url.join(url) {
            Ok(joined) => Some(joined.to_string()),
            Err(e) => {
                tracing::warn!(server = url, error = %e, "Ignoring unusable server URL");
                None
            }
        },
        SpecLocation::File(_) => {
            tracing::warn!(
                server = url,
                "Relative server URL in a local spec cannot be resolved; set a base URL override"
            );
            None
        }
    }
}
