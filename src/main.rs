//! geotally HTTP server
//!
//! Starts an Axum web server serving the configured demo app variant.

use clap::Parser;
use geotally::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

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

    // A missing default config file means "run with defaults"
    let (config, used_defaults) = if cli.uses_default_config() && !Path::new(&cli.config).exists()
    {
        (Config::default(), true)
    } else {
        (Config::from_file(&cli.config)?, false)
    };

    telemetry::init(&config.observability.log_level);

    if used_defaults {
        tracing::warn!(
            path = %cli.config,
            "Configuration file not found, using built-in defaults"
        );
    }

    let addr = config.server.socket_addr()?;
    let variant = config.app.variant;

    let state = AppState::new(Arc::new(config))?;
    let app = handlers::app(state);

    tracing::info!(
        variant = variant.as_str(),
        version = variant.version(),
        "Starting geotally server on {}",
        addr
    );
    tracing::info!("Health check available at http://{}/health", addr);
    if variant.is_instrumented() {
        tracing::info!("Metrics available at http://{}/metrics", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
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
