use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ifconfig_rs::config;
use ifconfig_rs::http::HttpServer;
use ifconfig_rs::observability;

/// What does the network see of me? An ifconfig.io-style lookup service.
#[derive(Debug, Parser)]
#[command(name = "ifconfig-rs", version, about)]
struct Args {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "IFCONFIG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ifconfig-rs: {e}");
            return Err(e.into());
        }
    };

    observability::init_tracing(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ifconfig-rs starting");

    tracing::info!(
        hostname = %config.hostname,
        port = config.listener.port,
        tls = config.tls.enabled,
        proxy_protocol = config.proxy_protocol.address.as_deref().unwrap_or("-"),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if let Some(address) = &config.observability.metrics_address {
        let addr: SocketAddr = address.parse()?;
        observability::init_metrics(addr);
    }

    let server = HttpServer::new(Arc::new(config));
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server stopped");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
