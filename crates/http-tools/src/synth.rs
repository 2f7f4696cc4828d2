//! Request synthesis: descriptor + merged variables + caller overrides -> outbound request.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::endpoint::{BodySpec, EndpointDescriptor, HttpMethod};
use crate::template::{VarMap, resolve, value_to_string};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const CONTENT_TYPE: &str = "Content-Type";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("unresolved relative URL for '{endpoint}': {url} (no base URL configured)")]
    UnresolvedRelativeUrl { endpoint: String, url: String },
    #[error("invalid URL for '{endpoint}': {url} ({reason})")]
    InvalidUrl {
        endpoint: String,
        url: String,
        reason: String,
    },
    #[error("invalid override URL {url} ({reason})")]
    InvalidOverrideUrl { url: String, reason: String },
}

/// Caller-supplied body, classified once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyOverride {
    /// Sent verbatim after template expansion.
    Text(String),
    /// Objects, arrays and non-string scalars.
    Structured(Value),
}

impl BodyOverride {
    /// `null` means "no override".
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(BodyOverride::Text(s)),
            other => Some(BodyOverride::Structured(other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOverrides {
    /// Replaces the endpoint URL entirely (still template-expanded).
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<BodyOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundBody {
    Text(String),
    Form(Vec<(String, String)>),
    /// Text fields only; the transport computes the boundary header.
    Multipart(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<OutboundBody>,
    /// The `Content-Type` header that will be sent, if any.
    pub content_type: Option<String>,
}

impl OutboundRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build the concrete request for one call.
///
/// Later sources win for the same key: descriptor query/headers first, then caller overrides.
/// Header names compare case-insensitively.
///
/// # Errors
///
/// Returns an error if the endpoint URL is relative and no base URL is available, or if the
/// resulting URL (or the override URL) does not parse.
pub fn synthesize(
    descriptor: &EndpointDescriptor,
    base_url: Option<&str>,
    vars: &VarMap,
    overrides: &CallOverrides,
) -> Result<OutboundRequest, SynthError> {
    let mut url = match &overrides.url {
        Some(raw) => {
            let resolved = resolve(raw, vars);
            Url::parse(&resolved).map_err(|e| SynthError::InvalidOverrideUrl {
                url: resolved.clone(),
                reason: e.to_string(),
            })?
        }
        None => endpoint_url(descriptor, base_url, vars)?,
    };

    apply_query(&mut url, descriptor, overrides, vars);

    let mut headers: Vec<(String, String)> = Vec::new();
    for (k, v) in &descriptor.headers {
        set_header(&mut headers, k, resolve(v, vars));
    }
    for (k, v) in &overrides.headers {
        set_header(&mut headers, k, resolve(v, vars));
    }

    let (body, inferred) = match &overrides.body {
        Some(body_override) => body_from_override(body_override, &descriptor.body, vars),
        None => body_from_spec(&descriptor.body, vars),
    };

    if let Some(content_type) = inferred
        && find_header(&headers, CONTENT_TYPE).is_none()
    {
        headers.push((CONTENT_TYPE.to_string(), content_type.to_string()));
    }
    if matches!(body, Some(OutboundBody::Multipart(_))) {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(CONTENT_TYPE));
    }

    let body = if descriptor.method.allows_body() {
        body
    } else {
        None
    };

    let content_type = find_header(&headers, CONTENT_TYPE).map(str::to_string);
    Ok(OutboundRequest {
        method: descriptor.method,
        url,
        headers,
        body,
        content_type,
    })
}

fn endpoint_url(
    descriptor: &EndpointDescriptor,
    base_url: Option<&str>,
    vars: &VarMap,
) -> Result<Url, SynthError> {
    let resolved = resolve(&descriptor.url_template, vars);
    if let Ok(url) = Url::parse(&resolved)
        && !url.cannot_be_a_base()
    {
        return Ok(url);
    }

    let Some(base) = base_url else {
        return Err(SynthError::UnresolvedRelativeUrl {
            endpoint: descriptor.identifier.clone(),
            url: resolved,
        });
    };

    let base = resolve(base, vars);
    let joined = join_base(&base, &resolved);
    Url::parse(&joined).map_err(|e| SynthError::InvalidUrl {
        endpoint: descriptor.identifier.clone(),
        url: joined.clone(),
        reason: e.to_string(),
    })
}

fn join_base(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('?') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn apply_query(
    url: &mut Url,
    descriptor: &EndpointDescriptor,
    overrides: &CallOverrides,
    vars: &VarMap,
) {
    if descriptor.query.is_empty() && overrides.query.is_empty() {
        return;
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (k, v) in descriptor.query.iter().chain(&overrides.query) {
        set_pair(&mut pairs, k, resolve(v, vars), |a, b| a == b);
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    set_pair(headers, name, value, str::eq_ignore_ascii_case);
}

/// Replace the first matching entry in place and drop later duplicates, else append.
fn set_pair(
    pairs: &mut Vec<(String, String)>,
    key: &str,
    value: String,
    same_key: impl Fn(&str, &str) -> bool,
) {
    match pairs.iter().position(|(k, _)| same_key(k.as_str(), key)) {
        Some(first) => {
            pairs[first].1 = value;
            let mut idx = 0;
            pairs.retain(|(k, _)| {
                let keep = idx <= first || !same_key(k.as_str(), key);
                idx += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value)),
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn body_from_override(
    body_override: &BodyOverride,
    declared: &BodySpec,
    vars: &VarMap,
) -> (Option<OutboundBody>, Option<&'static str>) {
    match body_override {
        BodyOverride::Text(text) => (Some(OutboundBody::Text(resolve(text, vars))), None),
        BodyOverride::Structured(value) if declared.is_multipart() => {
            let fields = match value {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| (k.clone(), resolve(&value_to_string(v), vars)))
                    .collect(),
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), resolve(&value_to_string(v), vars)))
                    .collect(),
                other => vec![("0".to_string(), resolve(&value_to_string(other), vars))],
            };
            (Some(OutboundBody::Multipart(fields)), None)
        }
        BodyOverride::Structured(value) => (
            Some(OutboundBody::Text(value.to_string())),
            Some(JSON_CONTENT_TYPE),
        ),
    }
}

fn body_from_spec(spec: &BodySpec, vars: &VarMap) -> (Option<OutboundBody>, Option<&'static str>) {
    match spec {
        BodySpec::None => (None, None),
        BodySpec::Raw { content, mime_hint } => {
            let inferred = mime_hint
                .as_deref()
                .filter(|hint| hint.eq_ignore_ascii_case("json"))
                .map(|_| JSON_CONTENT_TYPE);
            (Some(OutboundBody::Text(resolve(content, vars))), inferred)
        }
        BodySpec::UrlEncoded(entries) => (
            Some(OutboundBody::Form(resolve_entries(entries, vars))),
            Some(FORM_CONTENT_TYPE),
        ),
        BodySpec::Multipart(entries) => (
            Some(OutboundBody::Multipart(resolve_entries(entries, vars))),
            None,
        ),
    }
}

fn resolve_entries(entries: &[(String, String)], vars: &VarMap) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), resolve(v, vars)))
        .collect()
}
