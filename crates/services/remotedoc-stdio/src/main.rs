//! `remotedoc-stdio`: the `rmcp` stdio transport for direct desktop-client
//! integration. A single statically configured API key authorizes every
//! call, since stdio carries no per-request bearer header (§4.8, §6).

use clap::Parser;

use remotedoc_common::tracing_setup::setup_tracing_stderr;
use remotedoc_common::AppConfig;

#[derive(Parser)]
#[command(name = "remotedoc-stdio", about = "remotedoc stdio transport for desktop MCP clients")]
struct Cli {
    /// Path to a TOML configuration file, layered over env vars and defaults.
    #[arg(long)]
    config_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for the MCP JSON-RPC stream; every log line goes
    // to stderr, as the teacher's stdio binary does.
    setup_tracing_stderr();

    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config_file.as_deref())?;
    remotedoc_mcp::run_stdio(cfg).await
}
