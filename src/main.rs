//! Demo server for fetch-serve.
//!
//! `GET`/`HEAD` answer `Hello!`; every other method echoes the request body
//! back with the same `Content-Type`.

use std::path::PathBuf;

use axum::http::header::CONTENT_TYPE;
use clap::Parser;
use fetch_serve::config::{load_config, validate_config, ConfigError, ServerConfig};
use fetch_serve::lifecycle::abort_on_ctrl_c;
use fetch_serve::observability::init_logging;
use fetch_serve::{serve, AbortController, Headers, Request, Response, ServeOptions};

#[derive(Parser)]
#[command(name = "fetch-serve")]
#[command(about = "Serve a hello/echo handler over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides listener.hostname
    #[arg(long)]
    hostname: Option<String>,

    /// Overrides listener.port
    #[arg(short, long)]
    port: Option<u16>,
}

async fn hello_or_echo(request: Request) -> Response {
    let mut headers = Headers::new();
    if let Some(content_type) = request.headers().as_header_map().get(CONTENT_TYPE) {
        headers
            .as_header_map_mut()
            .insert(CONTENT_TYPE, content_type.clone());
    }

    match request.into_body() {
        Some(body) => Response::new(body).with_headers(headers),
        None => Response::text("Hello!"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(hostname) = cli.hostname {
        config.listener.hostname = hostname;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.logging)?;

    tracing::info!(
        hostname = %config.listener.hostname,
        port = config.listener.port,
        max_connections = config.listener.max_connections,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    let controller = AbortController::new();
    abort_on_ctrl_c(controller.clone());

    let server = serve(
        ServeOptions::from_config(hello_or_echo, &config).signal(controller.signal()),
    )
    .await?;

    server.stopped().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
