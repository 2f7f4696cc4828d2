//! Command-line flags and document discovery.
//!
//! Every flag has an environment variable. Documents come from `--collection` / `--openapi`
//! entries, from the `.env` file (`<KEY>_PATH` / `<KEY>_OPENAPI`), or, when neither names any,
//! from matching process environment variables.

use crate::error::{AdapterError, Result};
use clap::{Parser, ValueEnum};
use postman_mcp_http_tools::naming::slug;
use postman_mcp_openapi_tools::ApiSpecConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `.env` / process key naming the baseline environment document.
pub const ENVIRONMENT_FILE_KEY: &str = "POSTMAN_ENVIRONMENT_FILE";
const RESERVED_PREFIX: &str = "POSTMAN_MCP_";
const COLLECTION_SUFFIX: &str = "_PATH";
const OPENAPI_SUFFIX: &str = "_OPENAPI";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "postman-mcp-adapter",
    version,
    about = "Expose Postman collections and OpenAPI specs as MCP tools"
)]
pub struct Cli {
    /// Dotenv file with document entries (`<KEY>_PATH`, `<KEY>_OPENAPI`). Missing is fine.
    #[arg(long, env = "POSTMAN_MCP_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Postman environment document providing baseline variables.
    #[arg(long, env = ENVIRONMENT_FILE_KEY)]
    pub environment: Option<PathBuf>,

    /// Collection entry `name=path[,path...]` (repeatable; `;`-separated in the env var).
    #[arg(
        long = "collection",
        env = "POSTMAN_COLLECTIONS",
        value_delimiter = ';'
    )]
    pub collections: Vec<String>,

    /// `OpenAPI` spec entry `name=location`, location a file path or http(s) URL.
    #[arg(long = "openapi", env = "OPENAPI_SPECS", value_delimiter = ';')]
    pub openapi: Vec<String>,

    /// Base URL override `name=url` for relative endpoint URLs.
    #[arg(
        long = "base-url",
        env = "POSTMAN_MCP_BASE_URLS",
        value_delimiter = ';'
    )]
    pub base_urls: Vec<String>,

    #[arg(
        long,
        env = "POSTMAN_MCP_TRANSPORT",
        value_enum,
        default_value_t = TransportMode::Stdio
    )]
    pub transport: TransportMode,

    /// Listen address for `--transport http`.
    #[arg(long, env = "POSTMAN_MCP_BIND", default_value = "127.0.0.1:8765")]
    pub bind: SocketAddr,

    /// Variable written by the `set_token` tool.
    #[arg(long, env = "POSTMAN_MCP_TOKEN_VAR", default_value = "token")]
    pub token_var: String,

    /// Bound on loading one remote spec.
    #[arg(long, env = "POSTMAN_MCP_STARTUP_TIMEOUT_SECS", default_value_t = 30)]
    pub startup_timeout_secs: u64,

    #[arg(long, env = "POSTMAN_MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(
        long,
        env = "POSTMAN_MCP_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    /// Print an MCP client configuration snippet for the resolved documents and exit.
    #[arg(long)]
    pub print_client_config: bool,
}

/// One collection file under a document key. A key may name several files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSource {
    pub key: String,
    pub path: PathBuf,
}

/// Fully resolved adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub environment: Option<PathBuf>,
    pub collections: Vec<CollectionSource>,
    pub openapi: Vec<ApiSpecConfig>,
    /// `(document key, base URL)` overrides.
    pub base_urls: Vec<(String, String)>,
    pub transport: TransportMode,
    pub bind: SocketAddr,
    pub token_var: String,
    pub startup_timeout: Duration,
}

impl AdapterConfig {
    /// Resolve flags against the `.env` file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed entries or an unreadable (but present) `.env` file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let dotenv = read_dotenv(&absolutize(&cwd, &cli.env_file))?;
        Self::from_sources(cli, &dotenv, std::env::vars(), &cwd)
    }

    /// Resolution with every input explicit.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed `name=value` entries or an empty token variable.
    pub fn from_sources(
        cli: &Cli,
        dotenv: &[(String, String)],
        process_env: impl IntoIterator<Item = (String, String)>,
        cwd: &Path,
    ) -> Result<Self> {
        let token_var = cli.token_var.trim().to_string();
        if token_var.is_empty() {
            return Err(AdapterError::Config("--token-var must not be empty".to_string()));
        }

        let environment = cli
            .environment
            .clone()
            .or_else(|| {
                dotenv
                    .iter()
                    .find(|(k, v)| k == ENVIRONMENT_FILE_KEY && !v.trim().is_empty())
                    .map(|(_, v)| PathBuf::from(v.trim()))
            })
            .map(|p| absolutize(cwd, &p));

        let mut collections = Vec::new();
        for entry in &cli.collections {
            let (key, paths) = split_entry(entry, "--collection")?;
            collections.extend(collection_sources(&key, &paths, cwd));
        }
        let mut openapi = Vec::new();
        for entry in &cli.openapi {
            let (key, location) = split_entry(entry, "--openapi")?;
            openapi.push(ApiSpecConfig::new(key, spec_location(&location, cwd)));
        }

        let mut discovered = discover(dotenv.iter().cloned(), cwd, false);
        if collections.is_empty() && openapi.is_empty() && discovered.is_empty() {
            discovered = discover(process_env, cwd, true);
            if !discovered.is_empty() {
                tracing::info!(
                    "No documents configured in flags or .env; using process environment"
                );
            }
        }
        collections.extend(discovered.collections);
        openapi.extend(discovered.openapi);

        let mut base_urls = Vec::new();
        for entry in &cli.base_urls {
            base_urls.push(split_entry(entry, "--base-url")?);
        }
        for spec in &mut openapi {
            if let Some((_, url)) = base_urls
                .iter()
                .find(|(k, _)| same_document(k, &spec.name))
            {
                spec.base_url = Some(url.clone());
            }
        }

        if collections.is_empty() && openapi.is_empty() {
            tracing::warn!(
                "No collections or specs configured: only variable tools will be exposed"
            );
        }

        Ok(Self {
            environment,
            collections,
            openapi,
            base_urls,
            transport: cli.transport,
            bind: cli.bind,
            token_var,
            startup_timeout: Duration::from_secs(cli.startup_timeout_secs),
        })
    }

    /// Base URL override for a document key. Keys match when their tool-name slugs do.
    #[must_use]
    pub fn base_url_for(&self, key: &str) -> Option<&str> {
        self.base_urls
            .iter()
            .find(|(k, _)| same_document(k, key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct Discovered {
    collections: Vec<CollectionSource>,
    openapi: Vec<ApiSpecConfig>,
}

impl Discovered {
    fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.openapi.is_empty()
    }
}

/// Turn `KEY_PATH=a.json,b.json` / `KEY_OPENAPI=location` pairs into document entries.
///
/// `.env` files are trusted: any other non-reserved key is a collection entry too. Process
/// variables (`strict`) must carry a suffix and point at something that looks like a document.
fn discover(
    entries: impl IntoIterator<Item = (String, String)>,
    cwd: &Path,
    strict: bool,
) -> Discovered {
    let mut out = Discovered::default();
    for (key, value) in entries {
        let value = value.trim();
        if value.is_empty() || key == ENVIRONMENT_FILE_KEY || key.starts_with(RESERVED_PREFIX) {
            continue;
        }

        if let Some(name) = strip_suffix_ignore_case(&key, OPENAPI_SUFFIX) {
            if strict && !looks_like_document(value) {
                continue;
            }
            out.openapi
                .push(ApiSpecConfig::new(name, spec_location(value, cwd)));
            continue;
        }

        let name = match strip_suffix_ignore_case(&key, COLLECTION_SUFFIX) {
            Some(name) => name,
            None if strict => continue,
            None => key.as_str(),
        };
        let paths: Vec<&str> = split_list(value).collect();
        if strict && !paths.iter().all(|p| looks_like_document(p)) {
            continue;
        }
        out.collections
            .extend(collection_sources(name, &paths.join(","), cwd));
    }
    out
}

fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            let entries = iter
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| {
                    AdapterError::Config(format!("invalid env file '{}': {e}", path.display()))
                })?;
            tracing::debug!(path = %path.display(), entries = entries.len(), "Read env file");
            Ok(entries)
        }
        Err(e) if e.not_found() => {
            tracing::debug!(path = %path.display(), "No env file");
            Ok(Vec::new())
        }
        Err(e) => Err(AdapterError::Config(format!(
            "failed to read env file '{}': {e}",
            path.display()
        ))),
    }
}

fn same_document(a: &str, b: &str) -> bool {
    slug(&[a]) == slug(&[b])
}

fn split_entry(entry: &str, flag: &str) -> Result<(String, String)> {
    let (key, value) = entry.split_once('=').ok_or_else(|| {
        AdapterError::Config(format!("Invalid {flag} entry '{entry}': expected name=value"))
    })?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(AdapterError::Config(format!(
            "Invalid {flag} entry '{entry}': name and value must be non-empty"
        )));
    }
    Ok((key.to_string(), value.to_string()))
}

fn collection_sources(key: &str, paths: &str, cwd: &Path) -> Vec<CollectionSource> {
    split_list(paths)
        .map(|p| CollectionSource {
            key: key.to_string(),
            path: absolutize(cwd, Path::new(p)),
        })
        .collect()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn spec_location(location: &str, cwd: &Path) -> String {
    if is_url(location) {
        location.to_string()
    } else {
        absolutize(cwd, Path::new(location)).display().to_string()
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn looks_like_document(value: &str) -> bool {
    if is_url(value) {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    [".json", ".yaml", ".yml"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn strip_suffix_ignore_case<'a>(key: &'a str, suffix: &str) -> Option<&'a str> {
    let split = key.len().checked_sub(suffix.len())?;
    let (name, tail) = (key.get(..split)?, key.get(split..)?);
    (tail.eq_ignore_ascii_case(suffix) && !name.is_empty()).then_some(name)
}
