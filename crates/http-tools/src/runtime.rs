//! Outbound transport and response normalization.
//!
//! [`HttpTransport`] is the seam between the synthesized request and the network. The adapter
//! uses [`ReqwestTransport`]; tests substitute recording fakes.

use crate::endpoint::HttpMethod;
use crate::safety::{redact_url, sanitize_reqwest_error};
use crate::synth::{OutboundBody, OutboundRequest};
use async_trait::async_trait;
use mime::Mime;
use reqwest::Client;
use reqwest::multipart::Form;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    /// Non-2xx response. `body` is pretty JSON when parseable, raw text otherwise.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TransportResponse {
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends one request and returns the full response. Never retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse> {
        debug!(
            method = %request.method,
            url = %redact_url(&request.url),
            "outbound request"
        );

        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = apply_body(builder, request.method, request.body);

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn apply_body(
    request: reqwest::RequestBuilder,
    method: HttpMethod,
    body: Option<OutboundBody>,
) -> reqwest::RequestBuilder {
    if !method.allows_body() {
        return request;
    }
    match body {
        None => request,
        Some(OutboundBody::Text(text)) => request.body(text),
        Some(OutboundBody::Form(fields)) => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish();
            request.body(encoded)
        }
        Some(OutboundBody::Multipart(fields)) => {
            let form = fields
                .into_iter()
                .fold(Form::new(), |form, (k, v)| form.text(k, v));
            request.multipart(form)
        }
    }
}

/// Turn a raw response into the tool's text result.
///
/// JSON bodies (by declared content type) are pretty-printed when they parse; anything else is
/// returned as-is. A parse failure is never an error on its own.
///
/// # Errors
///
/// Returns [`HttpToolsError::Status`] for non-2xx statuses.
pub fn normalize_response(response: &TransportResponse) -> Result<String> {
    let rendered = if is_json_content_type(response.content_type()) {
        serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| response.body.clone())
    } else {
        response.body.clone()
    };

    if (200..300).contains(&response.status) {
        Ok(rendered)
    } else {
        Err(HttpToolsError::Status {
            status: response.status,
            body: rendered,
        })
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    match ct.parse::<Mime>() {
        Ok(m) => m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON),
        Err(_) => ct.to_ascii_lowercase().contains("application/json"),
    }
}
