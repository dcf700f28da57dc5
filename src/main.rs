//! VexaRoute HTTP server
//!
//! Starts an Axum web server that answers user queries through the dispatch
//! engine.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use vexaroute::cli::{Cli, Command, generate_config_template};
use vexaroute::{config::Config, handlers, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Arc::new(Config::from_file(&cli.config)?);

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config_path = %cli.config,
        host = %config.server.host,
        port = config.server.port,
        classifier = ?config.routing.classifier,
        accounts = config.accounts.len(),
        "Starting VexaRoute server"
    );

    let state = handlers::AppState::new(config.clone())?;
    let app = handlers::router(state);

    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("Invalid server.host '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::from((ip, config.server.port));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
