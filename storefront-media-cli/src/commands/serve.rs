//! `serve` command

use super::{open_store, INFO};
use anyhow::{Context, Result};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use clap::Args;
use console::style;
use std::net::SocketAddr;
use storefront_media::config::MediaConfig;
use storefront_media::http::{routes, GalleryState};
use tower_http::services::ServeDir;

/// Serve the gallery API and the stored files
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Listen address (overrides `server.addr`)
    #[arg(short, long)]
    addr: Option<SocketAddr>,
}

impl ServeCommand {
    /// Execute the serve command
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the address cannot be bound.
    pub async fn execute(&self, config: &MediaConfig) -> Result<()> {
        let store = open_store(config).await?;
        let app = app(config, GalleryState::new(store, config.storage.bucket.clone()));

        let addr = self.addr.unwrap_or(config.server.addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        println!(
            "{} {} on {}",
            INFO,
            style("Serving").green().bold(),
            style(format!("http://{}", listener.local_addr()?)).cyan()
        );
        println!("  {} {}", style("images:").dim(), "/images");
        println!("  {} {}", style("files:").dim(), "/media");
        tracing::info!(%addr, bucket = %config.storage.bucket, "Gallery server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Gallery server stopped");
        Ok(())
    }
}

/// Gallery API plus static files under `/media`
fn app(config: &MediaConfig, state: GalleryState) -> Router {
    let files = Router::new()
        .nest_service("/media", ServeDir::new(&config.storage.root))
        .layer(middleware::from_fn(hide_dot_segments));
    routes(state).merge(files)
}

/// Answers 404 for any path with a hidden segment, keeping the store's
/// metadata and staging directories off the file server
async fn hide_dot_segments(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.') || segment.to_ascii_lowercase().starts_with("%2e")
    });
    if hidden {
        tracing::debug!(path = %request.uri().path(), "Refused hidden media path");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
