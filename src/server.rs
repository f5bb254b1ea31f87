use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{any, get},
};
use tokio::net::TcpListener;

use crate::{Res, api, api::AppState};

/// Routes of the local player server.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::home))
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/api/token", any(api::exchange_token))
        .layer(Extension(state))
}

/// Binds the configured address and serves until the process exits.
pub async fn start_api_server(state: Arc<AppState>) -> Res<()> {
    let listener = TcpListener::bind(state.config.server_addr).await?;
    serve(listener, state).await
}

/// Serves on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Res<()> {
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
