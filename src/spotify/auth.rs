use std::collections::HashMap;

use rand::{Rng, distr::Alphanumeric};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    config::{Config, ConfigError},
    management::{TokenStore, TokenStoreError},
    types::{Credential, ExchangeRequest},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("no authorization code in redirect")]
    NoAuthorizationCode,
    #[error("authorization state does not match the pending login")]
    StateMismatch,
    #[error("token exchange failed with status {status}: {body}")]
    ExchangeFailed { status: u16, body: String },
    #[error("token exchange response has no access token")]
    MalformedResponse,
    #[error("credential was rejected by the provider")]
    ValidationFailed,
    #[error("token exchange request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] TokenStoreError),
}

/// Authorization redirect plus the anti-replay state it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Random anti-replay value for the `state` parameter.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Builds the authorization redirect with a freshly generated state.
///
/// Fails fast when the client id or redirect target is missing; nothing is
/// navigated in that case.
pub fn build_authorization_url(config: &Config) -> Result<AuthorizationRequest, ConfigError> {
    let state = generate_state();
    let url = authorization_url_with_state(config, &state)?;
    Ok(AuthorizationRequest { url, state })
}

/// Deterministic part of [`build_authorization_url`].
pub fn authorization_url_with_state(config: &Config, state: &str) -> Result<Url, ConfigError> {
    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Missing("SPOTIFY_CLIENT_ID"));
    }
    if config.redirect_uri.trim().is_empty() {
        return Err(ConfigError::Missing("SPOTIFY_REDIRECT_URI"));
    }

    let mut url = Url::parse(&config.auth_url).map_err(|e| ConfigError::Invalid {
        var: "SPOTIFY_AUTH_URL",
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &config.scope())
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("state", state)
        .append_pair("show_dialog", "true");
    Ok(url)
}

/// Picks the authorization code out of the redirect-return query.
///
/// An `error` parameter wins over a `code`. Having neither is an error too.
pub fn parse_redirect_return(params: &HashMap<String, String>) -> Result<String, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(AuthError::Denied(error.clone()));
    }

    match params.get("code") {
        Some(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(AuthError::NoAuthorizationCode),
    }
}

/// Posts `{code, redirectUri}` to the confidential exchange endpoint.
pub async fn exchange_code(
    client: &Client,
    exchange_url: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<Credential, AuthError> {
    let body = ExchangeRequest {
        code: Some(code.to_string()),
        redirect_uri: Some(redirect_uri.to_string()),
    };

    let response = client
        .post(exchange_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::ExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    let json: Value = response
        .json()
        .await
        .map_err(|_| AuthError::MalformedResponse)?;

    match json["access_token"].as_str() {
        Some(token) if !token.is_empty() => Ok(Credential::new(token)),
        _ => Err(AuthError::MalformedResponse),
    }
}

/// Drives the redirect/code/exchange handshake.
#[derive(Clone)]
pub struct AuthFlow {
    config: Config,
    client: Client,
    store: TokenStore,
}

impl AuthFlow {
    pub fn new(config: Config, store: TokenStore) -> Self {
        Self::with_client(config, store, Client::new())
    }

    pub fn with_client(config: Config, store: TokenStore, client: Client) -> Self {
        AuthFlow {
            config,
            client,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts a fresh login.
    ///
    /// The configuration is checked first. Then any stored credential is
    /// cleared so the user always goes through consent again.
    pub async fn login(&self) -> Result<AuthorizationRequest, AuthError> {
        let request = build_authorization_url(&self.config)?;
        self.store.clear().await?;
        Ok(request)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        exchange_code(
            &self.client,
            &self.config.exchange_url,
            code,
            &self.config.redirect_uri,
        )
        .await
    }

    /// Handles the redirect-return query end to end.
    ///
    /// `expected_state` is the state issued by the pending login, if any.
    /// The credential is persisted only after the provider accepted it.
    pub async fn handle_redirect_return(
        &self,
        params: &HashMap<String, String>,
        expected_state: Option<&str>,
    ) -> Result<Credential, AuthError> {
        let code = parse_redirect_return(params)?;

        match (expected_state, params.get("state")) {
            (Some(expected), Some(got)) if expected == got => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let credential = self.exchange_code(&code).await?;
        if !self.store.validate(&credential).await {
            return Err(AuthError::ValidationFailed);
        }

        self.store.save(&credential).await?;
        log::info!("new credential stored");
        Ok(credential)
    }
}
