/// One path-keyed specification to expose as a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSpecConfig {
    /// Document key; the tool name is its slug.
    pub name: String,

    /// `OpenAPI` spec location (URL or file path).
    pub spec: String,

    /// Override base URL from spec.
    pub base_url: Option<String>,
}

impl ApiSpecConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            base_url: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}
