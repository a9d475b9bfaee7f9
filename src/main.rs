use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedwatch::config::{Config, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "feedwatch",
    version,
    about = "Monitors job feeds and serves their vacancy counts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (overrides the configured level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// TOML config file; FEEDWATCH_* variables are used otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Probe one feed and count its vacancies
    Check {
        /// Feed URL
        url: String,

        /// Element name to count
        #[arg(long, default_value = feedwatch::config::DEFAULT_ITEM_ELEMENT)]
        item_element: String,

        /// Request timeout in seconds (overrides FEEDWATCH_REQUEST_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config comes first so its [logging] section drives the subscriber
    let config_path = match &cli.command {
        Commands::Serve { config, .. } => config.as_deref(),
        Commands::Check { .. } => None,
    };
    let config = Config::load(config_path)?;

    let logging = config
        .logging
        .clone()
        .with_overrides(cli.log_format.as_deref(), cli.verbose);
    logging.validate()?;
    setup_tracing(&logging)?;

    match cli.command {
        Commands::Serve { bind, config: path } => {
            tracing::info!(bind = ?bind, config = ?path, "Starting serve command");
            commands::serve(commands::ServeParams { bind, config }).await?;
        }
        Commands::Check {
            url,
            item_element,
            timeout,
        } => {
            tracing::info!(url = %url, "Starting check command");
            commands::check(commands::CheckParams {
                url,
                item_element,
                timeout,
                fetcher: config.fetcher,
            })
            .await?;
        }
    }

    Ok(())
}

fn setup_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(logging.filter_directives())?,
    };

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}
