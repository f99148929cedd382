//! `remotedoc-http`: the axum-hosted HTTP transport (health/ready/metrics,
//! `/mcp`, `/webhook/github`). A thin wrapper delegating to
//! `remotedoc_mcp::server::run_http`.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use remotedoc_common::AppConfig;

#[derive(Parser)]
#[command(name = "remotedoc-http", about = "remotedoc HTTP gateway")]
struct Cli {
    /// Path to a TOML configuration file, layered over env vars and defaults.
    #[arg(long)]
    config_file: Option<String>,
}

fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum=debug"));
    let json_logs = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config_file.as_deref())?;
    remotedoc_mcp::run_http(cfg).await
}
