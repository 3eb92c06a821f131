//! HTTP listener.
//!
//! No routes are registered yet: every request is answered with
//! `404 Not Found`. The listener exists so deployments can already wire up
//! the bind address that the query API will be served on.

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::config::Config;

pub fn router() -> Router {
    Router::new()
}

pub async fn run_server(config: &Config) -> Result<()> {
    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "http listener started");

    axum::serve(listener, router()).await?;
    Ok(())
}
