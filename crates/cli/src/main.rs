mod config_commands;
mod session_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tether_config::TetherConfig,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tether", about = "Keep a remote session alive", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of the discovered one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the session service base URL.
    #[arg(long, global = true, env = "TETHER_SESSION_BASE")]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Session lifecycle calls.
    #[command(flatten)]
    Session(session_commands::SessionAction),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TetherConfig> {
    let mut config = match &cli.config {
        Some(path) => tether_config::load_config(path)?,
        None => tether_config::discover_and_load(),
    };
    if let Some(base) = &cli.base_url {
        config.session.base_url = base.clone();
    }
    debug!(base_url = %config.session.base_url, "effective session base");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tether starting");

    let config = load_config(&cli)?;
    match cli.command {
        Commands::Session(action) => session_commands::handle_session(action, &config).await,
        Commands::Config { action } => config_commands::handle_config(action, &config),
    }
}
