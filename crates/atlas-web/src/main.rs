//! atlas-web — Axum server exposing the assistant over HTTP and WebSocket.

mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use atlas_core::assistant::Assistant;
use atlas_core::capability::NullSurface;
use atlas_core::config::Config;

use server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::load_or_default(&project_root.join("config.yaml"))
        .context("Failed to load config")?;

    // Replies go back in the HTTP response and over /ws
    let mut assistant = Assistant::start(&config, Arc::new(NullSurface))?;

    let state = Arc::new(AppState {
        dispatcher: assistant.dispatcher.clone(),
        ctx: assistant.ctx.clone(),
        poll_interval_seconds: config.poll_interval_seconds,
        started_at: Instant::now(),
    });
    let app = server::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.web_port);
    let addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    eprintln!("  Atlas listening on http://localhost:{}\n", port);

    let shutdown_token = assistant.ctx.shutdown.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    assistant.shutdown().await;
    info!("Server stopped.");
    Ok(())
}
