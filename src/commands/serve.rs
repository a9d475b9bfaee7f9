//! Serve command implementation

use anyhow::{Context, Result};
use std::net::SocketAddr;

use feedwatch::config::Config;
use feedwatch::metrics;
use feedwatch::server::FeedWatchServer;

/// Parameters of the serve command
pub struct ServeParams {
    pub bind: Option<SocketAddr>,
    pub config: Config,
}

/// Start the feedwatch server
pub async fn serve(params: ServeParams) -> Result<()> {
    let ServeParams { bind, mut config } = params;

    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Continuing without metrics");
    }

    let server = FeedWatchServer::new(config).context("Failed to create feedwatch server")?;
    let info = server.info();

    println!("{}", info.display());
    println!();
    println!("API Endpoints:");
    println!("  GET  /feedinfo?url=<feed>     - Feed stat and vacancy count");
    println!("  GET  /feeds                   - Tracked feeds");
    println!("  GET  /health                  - Health check");
    println!("  GET  /metrics                 - Prometheus metrics endpoint");
    println!();
    println!("Feedwatch server listening on http://{}", info.bind_address);
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Feedwatch server stopped.");
    Ok(())
}
