use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{spotify::auth::AuthError, warning};

use super::{AppState, REDIRECT_DELAY_SECS, redirect_page};

/// Redirect-return page of the authorization flow.
///
/// On success the credential is stored, handed to the running session and
/// the browser is sent back to `/`. Failures render a short message and
/// also return home.
pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expected = state.pending_state.lock().await.take();

    match state
        .flow
        .handle_redirect_return(&params, expected.as_deref())
        .await
    {
        Ok(credential) => {
            state.issued.send_replace(Some(credential.clone()));
            if let Some(session) = &state.session {
                session.credential_issued(credential);
            }

            Html(redirect_page(
                "Authentication successful",
                "You can close this window or wait to be sent back.",
                "/",
                REDIRECT_DELAY_SECS,
            ))
            .into_response()
        }
        Err(e) => {
            warning!("Authorization failed: {}", e);
            let status = match e {
                AuthError::Denied(_)
                | AuthError::NoAuthorizationCode
                | AuthError::StateMismatch => StatusCode::BAD_REQUEST,
                AuthError::Configuration(_) | AuthError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            };

            (
                status,
                Html(redirect_page(
                    "Authentication failed",
                    &e.to_string(),
                    "/",
                    REDIRECT_DELAY_SECS,
                )),
            )
                .into_response()
        }
    }
}
