//! Canonical endpoint model shared by every document loader.
//!
//! Loaders (collection trees, path-keyed specs) reduce their source shape to [`EndpointDescriptor`]
//! values. Descriptors are immutable once built and are read concurrently by every tool call.

use std::fmt;
use std::str::FromStr;

use crate::runtime::HttpToolsError;

/// The closed set of HTTP methods an endpoint may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET and HEAD never carry a request body.
    #[must_use]
    pub fn allows_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = s.trim().to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == method)
            .ok_or_else(|| {
                HttpToolsError::Config(format!("Unsupported HTTP method '{}'", s.trim()))
            })
    }
}

/// Request body as declared by the source document. Values are templates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodySpec {
    #[default]
    None,
    Raw {
        content: String,
        /// Declared language (`json`, `text`, `xml`, ...). Only `json` influences the content type.
        mime_hint: Option<String>,
    },
    UrlEncoded(Vec<(String, String)>),
    Multipart(Vec<(String, String)>),
}

impl BodySpec {
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self, BodySpec::Multipart(_))
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, BodySpec::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Unique within one document; the `endpoint` argument selects by this key.
    pub identifier: String,
    /// Joined ancestry of names. Not unique.
    pub display_name: String,
    pub method: HttpMethod,
    /// Absolute URL or a path relative to the document base URL, with `{{var}}` placeholders.
    pub url_template: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: BodySpec,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive_and_closed() {
        assert_eq!("get".parse::<HttpMethod>().ok(), Some(HttpMethod::Get));
        assert_eq!(
            " Patch ".parse::<HttpMethod>().ok(),
            Some(HttpMethod::Patch)
        );
        let err = "PROPFIND".parse::<HttpMethod>().unwrap_err();
        assert!(err.to_string().contains("PROPFIND"));
    }

    #[test]
    fn only_get_and_head_drop_bodies() {
        let without: Vec<_> = HttpMethod::ALL
            .into_iter()
            .filter(|m| !m.allows_body())
            .collect();
        assert_eq!(without, vec![HttpMethod::Get, HttpMethod::Head]);
    }
}
