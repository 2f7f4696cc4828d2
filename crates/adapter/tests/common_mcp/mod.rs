use anyhow::Context as _;
use futures::TryStreamExt as _;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

const SESSION_HEADER: &str = "Mcp-Session-Id";
const REPLY_TIMEOUT: Duration = Duration::from_secs(20);

/// One MCP session against the adapter's `/mcp` endpoint. Two instances are two independent
/// session variable bags.
pub struct McpStreamableHttpSession {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
    next_id: AtomicU64,
}

impl McpStreamableHttpSession {
    /// `initialize` + `notifications/initialized`.
    pub async fn connect(mcp_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let endpoint = mcp_url.trim_end_matches('/').to_string();

        let init = send(
            &client,
            &endpoint,
            None,
            &envelope(
                Some(0),
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "postman-mcp-adapter-tests", "version": "0" }
                }),
            ),
        )
        .await?;
        let session_id = init
            .headers()
            .get(SESSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .context("initialize reply has no session header")?
            .to_string();
        let reply = first_event(init).await?;
        anyhow::ensure!(reply["id"] == json!(0), "initialize reply id: {reply}");
        anyhow::ensure!(
            reply["result"]["capabilities"]["tools"].is_object(),
            "server does not advertise tools: {reply}"
        );

        let ack = send(
            &client,
            &endpoint,
            Some(&session_id),
            &envelope(None, "notifications/initialized", json!({})),
        )
        .await?;
        anyhow::ensure!(
            ack.status() == reqwest::StatusCode::ACCEPTED,
            "notifications/initialized answered {}",
            ack.status()
        );

        Ok(Self {
            client,
            endpoint,
            session_id,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// One JSON-RPC request; the reply is returned whole, `error` included.
    pub async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = send(
            &self.client,
            &self.endpoint,
            Some(&self.session_id),
            &envelope(Some(id), method, params),
        )
        .await?;
        let reply = tokio::time::timeout(REPLY_TIMEOUT, first_event(resp))
            .await
            .with_context(|| format!("no reply to {method} within {REPLY_TIMEOUT:?}"))??;
        anyhow::ensure!(reply["id"] == json!(id), "reply id mismatch: {reply}");
        Ok(reply)
    }

    /// Names from `tools/list`, in server order.
    pub async fn tool_names(&self) -> anyhow::Result<Vec<String>> {
        let reply = self.request("tools/list", json!({})).await?;
        let tools = reply["result"]["tools"]
            .as_array()
            .context("tools/list has no tools array")?;
        Ok(tools
            .iter()
            .filter_map(|t| t["name"].as_str().map(str::to_string))
            .collect())
    }

    /// `tools/call`, returning the first text block and the `isError` flag.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> anyhow::Result<(String, bool)> {
        let reply = self
            .request(
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        let result = reply
            .get("result")
            .with_context(|| format!("{name}: {reply}"))?;
        let text = result["content"][0]["text"]
            .as_str()
            .with_context(|| format!("{name} returned no text content: {reply}"))?;
        Ok((
            text.to_string(),
            result["isError"].as_bool().unwrap_or(false),
        ))
    }
}

fn envelope(id: Option<u64>, method: &str, params: Value) -> Value {
    let mut msg = json!({ "jsonrpc": "2.0", "method": method, "params": params });
    if let Some(id) = id {
        msg["id"] = json!(id);
    }
    msg
}

async fn send(
    client: &reqwest::Client,
    endpoint: &str,
    session_id: Option<&str>,
    body: &Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(endpoint)
        .header(
            reqwest::header::ACCEPT,
            "application/json, text/event-stream",
        )
        .json(body);
    if let Some(id) = session_id {
        req = req.header(SESSION_HEADER, id);
    }
    req.send()
        .await
        .with_context(|| format!("POST {endpoint}"))?
        .error_for_status()
        .context("MCP endpoint status")
}

/// The first `data:` payload of an event-stream reply, parsed as JSON. Reading stops there; the
/// server may keep the stream open.
async fn first_event(resp: reqwest::Response) -> anyhow::Result<Value> {
    let bytes = resp.bytes_stream().map_err(std::io::Error::other);
    let mut lines = tokio::io::BufReader::new(StreamReader::new(bytes)).lines();

    let mut data = String::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if let Some(chunk) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk.trim_start());
        } else if line.is_empty() && !data.is_empty() {
            return serde_json::from_str(&data).context("event data is not JSON");
        }
    }
    anyhow::bail!("event stream closed before a message arrived")
}
