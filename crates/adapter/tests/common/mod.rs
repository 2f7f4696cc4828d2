use anyhow::Context as _;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

pub use postman_mcp_test_support::{EchoServer, KillOnDrop};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    postman_mcp_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    postman_mcp_test_support::wait_http_ok(url, timeout_dur).await
}

/// Start the adapter binary on streamable HTTP. `workdir` holds no `.env`, so only `args` count.
pub fn spawn_adapter(workdir: &Path, args: &[String], port: u16) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_postman-mcp-adapter");
    Command::new(bin)
        .current_dir(workdir)
        .args(args)
        .arg("--env-file")
        .arg(workdir.join("absent.env"))
        .arg("--transport")
        .arg("http")
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--log-level")
        .arg("info")
        .stdout(Stdio::null())
        .spawn()
        .context("spawn adapter")
}
