use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use super::AppState;

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let session = state
        .session
        .as_ref()
        .map(|s| format!("{:?}", s.view().phase));

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "session": session,
    }))
}
