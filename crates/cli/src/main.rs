mod config_commands;
mod rotate_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "pocmon",
    version,
    about = "Rotate the point of contact of Slack channels"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery in ./ and ~/.config/pocmon/).
    #[arg(long, global = true, env = "POCMON_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rotation scheduler (default when no subcommand is provided).
    Run,
    /// Rotate one channel immediately.
    Rotate {
        /// Channel name, without the leading '#'.
        #[arg(long)]
        channel: String,
        /// Read membership from Slack but only log the topic and message.
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a starter config file.
    Init {
        /// Channel to put in the starter config.
        #[arg(long, default_value = "general")]
        channel: String,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "pocmon starting");

    let config = cli.config.as_deref();
    match cli.command {
        None | Some(Commands::Run) => rotate_commands::run(config).await,
        Some(Commands::Rotate { channel, dry_run }) => {
            rotate_commands::rotate_once(config, &channel, dry_run).await
        },
        Some(Commands::Check { verbose }) => config_commands::check(config, verbose),
        Some(Commands::Init { channel, force }) => {
            let path = config_commands::init(cli.config.clone(), &channel, force)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}
