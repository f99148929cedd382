//! `remotedoc-cli`: the operator entry point. Validates configuration,
//! starts the HTTP or stdio transport, or prints the tool catalog for
//! documentation generation — following the teacher's `mcp-stdio` CLI
//! shape (`schema`/`tools` subcommands) generalized with the `--enable-webhook`
//! / `--sync-interval` mutual exclusion and `--port` override §6 requires.

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use remotedoc_common::AppConfig;

#[derive(Parser)]
#[command(name = "remotedoc-cli", about = "remotedoc operator CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// Run in webhook-driven sync mode. Mutually exclusive with `--sync-interval`.
    #[arg(long, conflicts_with = "sync_interval")]
    enable_webhook: bool,

    /// Periodic sync interval in seconds. Mutually exclusive with `--enable-webhook`.
    #[arg(long)]
    sync_interval: Option<u64>,

    /// Path to a TOML configuration file, layered over env vars and defaults.
    #[arg(long)]
    config_file: Option<String>,

    /// Override the configured listen port (HTTP transport only).
    #[arg(long)]
    port: Option<u16>,

    /// Which transport to serve: `http` (axum, bearer auth, webhook) or
    /// `stdio` (single static key, for desktop MCP clients).
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    Http,
    Stdio,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured transport (the default when no subcommand is given).
    Serve {
        #[command(flatten)]
        args: ServerArgs,
    },
    /// Dump the JSON schema of every RPC tool.
    Schema {
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<String>,
    },
    /// List every RPC tool's name and description.
    Tools,
}

fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,remotedoc=debug"));
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Schema { output }) => print_schema(output.as_deref()),
        Some(Commands::Tools) => {
            print_tools();
            Ok(())
        }
        Some(Commands::Serve { args }) => serve(args).await,
        None => serve(cli.server).await,
    }
}

async fn serve(args: ServerArgs) -> anyhow::Result<()> {
    let mut cfg = AppConfig::load(args.config_file.as_deref())?;

    if args.enable_webhook {
        cfg.webhook_enabled = true;
        cfg.sync_interval_secs = None;
    }
    if let Some(interval) = args.sync_interval {
        cfg.sync_interval_secs = Some(interval);
        cfg.webhook_enabled = false;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }

    match args.transport {
        Transport::Http => remotedoc_mcp::run_http(cfg).await,
        Transport::Stdio => remotedoc_mcp::run_stdio(cfg).await,
    }
}

fn print_schema(output: Option<&str>) -> anyhow::Result<()> {
    let tools = remotedoc_mcp::tool_catalog();
    let content = serde_json::to_string_pretty(&tools)?;
    match output {
        Some(path) => {
            std::fs::write(path, &content)?;
            eprintln!("schema written to {path}");
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn print_tools() {
    let tools = remotedoc_mcp::tool_catalog();
    println!("remotedoc tools ({} total)\n", tools.len());
    println!("{:<12} {}", "TOOL", "DESCRIPTION");
    println!("{}", "-".repeat(60));
    for tool in &tools {
        let description = tool.description.as_deref().unwrap_or("");
        println!("{:<12} {description}", tool.name);
    }
}
