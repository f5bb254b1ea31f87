use std::sync::Arc;

use axum::{
    Extension,
    body::Bytes,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use crate::types::ExchangeRequest;

use super::AppState;

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Confidential authorization-code exchange.
///
/// Accepts `{code, redirectUri}` and forwards the provider's response body
/// and status unchanged. The client secret never leaves this process.
pub async fn exchange_token(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let request: ExchangeRequest = serde_json::from_slice(&body).unwrap_or_default();
    let config = &state.config;

    let (Some(code), Some(redirect_uri), Some(secret)) = (
        request.code.filter(|c| !c.is_empty()),
        request.redirect_uri.filter(|r| !r.is_empty()),
        config.client_secret.as_deref(),
    ) else {
        return failure(StatusCode::BAD_REQUEST, "Missing required parameters");
    };
    if config.client_id.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Missing required parameters");
    }

    let basic = STANDARD.encode(format!("{}:{}", config.client_id, secret));
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let response = match state
        .http
        .post(&config.token_url)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
        .form(&params)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            log::error!("token endpoint unreachable: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let payload: Value = match response.json().await {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("token endpoint returned unreadable body: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if !status.is_success() {
        log::warn!("token exchange rejected with status {}", status);
    }
    (status, Json(payload)).into_response()
}
