mod app_state;
mod config;
mod error;
mod handlers;
mod registry;
mod room;
mod signal;
mod sweeper;

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    http::{header::HeaderName, HeaderValue},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{app_state::AppState, config::Config, handlers::health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(
        prefix = %config.relay_prefix,
        static_dir = %config.static_dir,
        mailbox_capacity = config.mailbox_capacity,
        "starting signaling relay"
    );

    let app_state = AppState::new(config.clone());

    if config.eviction_enabled() {
        info!(
            ttl_secs = config.peer_ttl.as_secs(),
            every_secs = config.sweep_interval.as_secs(),
            "stale peer eviction enabled"
        );
        sweeper::spawn(
            app_state.registry.clone(),
            config.peer_ttl,
            config.sweep_interval,
        );
    }

    let app = build_router(app_state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

/// Relay endpoints, health and static assets, wrapped in request tracing and
/// the cross-origin isolation headers the browser client needs.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.relay_prefix.clone();
    let assets = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .merge(handlers::relay_routes(&prefix))
        .nest_service("/static", assets)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-embedder-policy"),
            HeaderValue::from_static("require-corp"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ))
        .layer(TraceLayer::new_for_http())
}
