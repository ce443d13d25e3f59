// Copyright 2026 Online Watch Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use online_watch::acquisition::RetryPolicy;
use online_watch::cli::{self, output, run_cmd::RunOptions, run_cmd::Transport};
use online_watch::config::DEFAULT_SITE;

#[derive(Parser)]
#[command(
    name = "online-watch",
    about = "Online Watch: sample concurrently viewing counters into a rolling 30-day history",
    version,
    after_help = "Run 'online-watch <command> --help' for details on each command.\nRun 'online-watch' with no command to sample the default site."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress the human-readable summary
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample every monitored item once and update the stored history
    Run {
        /// Site key (see `online-watch sites`)
        #[arg(default_value = DEFAULT_SITE)]
        site: String,
        /// JSON file listing the items to sample (defaults to the built-in list)
        #[arg(long)]
        items: Option<PathBuf>,
        /// Directory holding online_users.json and its dated archives
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// How pages are fetched
        #[arg(long, value_enum, default_value_t = Transport::Http)]
        transport: Transport,
        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Attempts per item, including the first
        #[arg(long)]
        attempts: Option<u32>,
        /// Retry policy: until-non-zero or transport-only
        #[arg(long)]
        retry_policy: Option<RetryPolicy>,
        /// Wait between items in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,
    },
    /// List the known sites
    Sites,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::JSON_ENV, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_ENV, "1");
    }
    init_tracing(&cli.log_level, cli.log_json);

    let result = match cli.command {
        None => cli::run_cmd::run(RunOptions::default()).await,
        Some(Commands::Run {
            site,
            items,
            data_dir,
            transport,
            timeout,
            attempts,
            retry_policy,
            pace_ms,
        }) => {
            cli::run_cmd::run(RunOptions {
                site,
                items_file: items,
                data_dir,
                transport,
                timeout_ms: timeout,
                attempts,
                retry_policy,
                pace_ms,
            })
            .await
        }
        Some(Commands::Sites) => cli::sites_cmd::run(),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "online-watch", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
