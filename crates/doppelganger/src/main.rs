use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use doppelganger::server::DEFAULT_HOST;
use doppelganger::{ServerManager, ServerSet};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serve canned HTTP responses described by a JSON configuration
#[derive(Parser, Debug)]
#[command(name = "doppelganger")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(env = "DOPPELGANGER_CONFIG")]
    config: PathBuf,

    /// Log every request body
    #[arg(short, long)]
    verbose: bool,

    /// Validate the configuration and exit without binding
    #[arg(long)]
    check: bool,

    /// Address every server binds to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "doppelganger=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    let set = match ServerSet::from_file(&args.config) {
        Ok(set) => set,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    let manager = match ServerManager::new(set, args.verbose) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    if args.check {
        info!(
            servers = manager.servers().len(),
            "Configuration {} is valid",
            args.config.display()
        );
        return ExitCode::SUCCESS;
    }

    let running = match manager.start(&args.host).await {
        Ok(running) => running,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
    running.shutdown_and_wait().await;
    ExitCode::SUCCESS
}
