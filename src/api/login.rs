use std::sync::Arc;

use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use super::AppState;

/// Drops any current credential and redirects to the provider's consent
/// page with a fresh state value.
pub async fn login(Extension(state): Extension<Arc<AppState>>) -> Response {
    if let Some(session) = &state.session {
        session.logout();
    }

    match state.flow.login().await {
        Ok(request) => {
            state.expect_state(request.state).await;
            Redirect::to(request.url.as_str()).into_response()
        }
        Err(e) => {
            log::error!("cannot start login: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
