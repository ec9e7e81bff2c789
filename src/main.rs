// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! mcp-server-gemini entry point: CLI parsing, telemetry and the stdio loop.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{info, Level};

use gemini_mcp::config::{self, CliOptions};
use gemini_mcp::protocol::{Session, SERVER_NAME};
use gemini_mcp::providers::{env_client_factory, models};
use gemini_mcp::telemetry::{init_telemetry, TelemetryConfig};
use gemini_mcp::tools::{FileReader, ToolRegistry};
use gemini_mcp::VERSION;

/// MCP server exposing Gemini-backed tools over stdio.
#[derive(Parser)]
#[command(name = "mcp-server-gemini")]
#[command(author, version, about = "Gemini tools over the Model Context Protocol", long_about = None)]
struct Cli {
    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Directory that file-reading tools are confined to
    #[arg(long)]
    root: Option<PathBuf>,

    /// Explicit config file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries for rate limits, timeouts and server errors
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base URL for the Gemini API
    #[arg(long)]
    base_url: Option<String>,

    /// HTTP(S) proxy URL
    #[arg(long)]
    proxy: Option<String>,

    /// Show verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show debug output
    #[arg(long)]
    debug: bool,

    /// Show trace output (full payloads)
    #[arg(long)]
    trace: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with_all = ["verbose", "debug", "trace"])]
    quiet: bool,

    /// Log filter directive, e.g. `gemini_mcp=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "DIRECTIVE")]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC on stdin/stdout (default)
    Serve,
    /// Print the model catalog as JSON
    Models,
    /// Print the tool catalog as JSON
    Tools,
}

impl Cli {
    fn telemetry(&self) -> TelemetryConfig {
        let config = if self.trace {
            TelemetryConfig::development().with_level(Level::TRACE)
        } else if self.debug {
            TelemetryConfig::development()
        } else if self.verbose {
            TelemetryConfig::default().with_level(Level::DEBUG)
        } else if self.quiet {
            TelemetryConfig::quiet()
        } else {
            TelemetryConfig::default()
        };

        match &self.log_filter {
            Some(directive) => config.with_filter(directive.as_str()),
            None => config,
        }
    }

    fn options(&self) -> CliOptions {
        CliOptions {
            model: self.model.clone(),
            root: self.root.clone(),
            config: self.config.clone(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            base_url: self.base_url.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Models) => {
            println!("{}", serde_json::to_string_pretty(&models::catalog())?);
            Ok(())
        }
        Some(Commands::Tools) => {
            let registry = ToolRegistry::with_defaults();
            println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
            Ok(())
        }
        Some(Commands::Serve) | None => serve(&cli).await,
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let _telemetry = init_telemetry(&cli.telemetry())?;

    let cwd = std::env::current_dir()?;
    let config = config::load_config(&cwd, cli.options())?;
    let files = FileReader::new(&config.root)?;

    info!("{SERVER_NAME} v{VERSION}");
    info!(model = %config.model, root = %config.root.display(), "Configuration loaded");
    info!("Waiting for requests...");

    let mut session = Session::with_defaults(env_client_factory(config), files);
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = session.serve(stdin, stdout) => result?,
        _ = shutdown_signal() => info!("Shutting down..."),
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
