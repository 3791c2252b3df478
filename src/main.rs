use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use runchart_core::config::AppConfig;
use runchart_core::types::{RunContext, EXIT_INVALID};
use runchart_engine::commands;
use runchart_tools::ShellRunner;

const DEFAULT_CONFIG: &str = "runchart.toml";
const DEFAULT_LOG_FILTER: &str = "runchart=warn";

#[derive(Parser)]
#[command(name = "runchart", version, about = "Execute a Mermaid flowchart as shell control flow")]
struct Cli {
    /// Path to config file (default: ./runchart.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, validate and execute a flowchart
    Run {
        /// Flowchart file
        file: PathBuf,
        /// Maximum number of node transitions (non-positive means the default)
        #[arg(long, allow_negative_numbers = true)]
        max_steps: Option<i64>,
        /// Deadline for the whole run in seconds (0 disables it)
        #[arg(long)]
        timeout: Option<u64>,
        /// Show node command stdout/stderr
        #[arg(long)]
        show_output: bool,
    },
    /// Check a flowchart without running anything
    Validate {
        /// Flowchart file
        file: PathBuf,
    },
    /// Print a validated flowchart as JSON
    Inspect {
        /// Flowchart file
        file: PathBuf,
    },
    /// Show the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn load_config(path: Option<&Path>) -> runchart_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_or_default(Path::new(DEFAULT_CONFIG)),
    }
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("runchart=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.log_level().unwrap_or(DEFAULT_LOG_FILTER))
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Run the subcommands that only read the flowchart. They never touch the
/// config file, so their exit code stays 0 or 2.
fn run_flowchart_check(
    command: &Commands,
    out: &mut (dyn Write + Send),
    err_out: &mut (dyn Write + Send),
) -> Option<i32> {
    match command {
        Commands::Validate { file } => Some(commands::validate(file, out, err_out)),
        Commands::Inspect { file } => Some(commands::inspect(file, out, err_out)),
        _ => None,
    }
}

/// Cancel `cancel` once `signal` fires. A signal that cannot be listened
/// for leaves the run alone.
async fn cancel_on_interrupt(
    signal: impl Future<Output = io::Result<()>>,
    cancel: CancellationToken,
) {
    match signal.await {
        Ok(()) => {
            info!("Interrupted, stopping flowchart...");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "runchart", &mut io::stdout());
        return Ok(());
    }

    let mut out = io::stdout();
    let mut err_out = io::stderr();

    if matches!(cli.command, Commands::Validate { .. } | Commands::Inspect { .. }) {
        init_tracing(&AppConfig::default(), cli.verbose);
        let code = run_flowchart_check(&cli.command, &mut out, &mut err_out)
            .unwrap_or(EXIT_INVALID);
        out.flush().ok();
        std::process::exit(code);
    }

    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose);
    debug!(config = ?cli.config, "Configuration loaded");

    let code = match cli.command {
        Commands::Run {
            file,
            max_steps,
            timeout,
            show_output,
        } => {
            if let Some(max_steps) = max_steps {
                config.execution.max_steps = max_steps;
            }
            if let Some(timeout) = timeout {
                config.execution.timeout_secs = timeout;
            }
            if show_output {
                config.runner.show_output = true;
            }

            let cancel = CancellationToken::new();

            // Kill the running command on Ctrl-C
            tokio::spawn(cancel_on_interrupt(tokio::signal::ctrl_c(), cancel.clone()));

            let mut ctx = RunContext::new(cancel);
            if let Some(timeout) = config.execution.timeout() {
                ctx = ctx.with_timeout(timeout);
            }

            let runner = Arc::new(ShellRunner::new(config.runner.clone()));
            commands::execute(
                &file,
                &mut out,
                &mut err_out,
                runner,
                config.execution.max_steps,
                &ctx,
            )
            .await
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Validate { .. } | Commands::Inspect { .. } | Commands::Completions { .. } => {
            unreachable!("handled before config load")
        }
    };

    out.flush().ok();
    std::process::exit(code);
}
