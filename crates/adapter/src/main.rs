use anyhow::Context as _;
use clap::Parser;
use postman_mcp_adapter::build_engine;
use postman_mcp_adapter::client_config::client_config;
use postman_mcp_adapter::config::{AdapterConfig, Cli, LogFormat, TransportMode};
use postman_mcp_adapter::server::{serve_http, serve_stdio};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = AdapterConfig::load(&cli).context("resolve configuration")?;

    if cli.print_client_config {
        let exe = std::env::current_exe().context("locate adapter executable")?;
        let snippet = client_config(&config, &exe);
        println!(
            "{}",
            serde_json::to_string_pretty(&snippet).context("render client config")?
        );
        return Ok(());
    }

    let engine = Arc::new(build_engine(&config).await);
    tracing::info!(
        tools = engine.catalog().len(),
        transport = ?config.transport,
        "Adapter ready"
    );

    match config.transport {
        TransportMode::Stdio => serve_stdio(engine).await.context("stdio transport")?,
        TransportMode::Http => serve_http(engine, config.bind)
            .await
            .context("streamable HTTP transport")?,
    }
    Ok(())
}

/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
