//! # API Module
//!
//! HTTP endpoints served by the local player server.
//!
//! ## Endpoints
//!
//! - [`exchange_token`] - `POST /api/token`, the confidential half of the
//!   authorization-code exchange. Holds the client secret and forwards the
//!   provider's token response verbatim.
//! - [`callback`] - `GET /callback`, the redirect-return page. Exchanges the
//!   code, validates and stores the credential, then sends the browser home.
//! - [`login`] - `GET /login`, clears any credential and redirects to the
//!   provider's consent page.
//! - [`home`] - `GET /`, the landing view.
//! - [`health`] - `GET /health`, status and version for monitoring.
//!
//! Handlers share one [`AppState`] through an `Extension` layer.

mod callback;
mod health;
mod home;
mod login;
mod token;

use tokio::sync::{Mutex, watch};

use crate::{
    config::Config,
    management::TokenStore,
    session::SessionHandle,
    spotify::auth::AuthFlow,
    types::Credential,
};

pub use callback::callback;
pub use health::health;
pub use home::home;
pub use login::login;
pub use token::exchange_token;

/// Seconds the redirect-return page waits before navigating home.
pub const REDIRECT_DELAY_SECS: u64 = 3;

/// State shared by all handlers.
pub struct AppState {
    pub config: Config,
    pub flow: AuthFlow,
    pub store: TokenStore,
    pub http: reqwest::Client,
    /// Anti-replay state issued by the most recent login.
    pub pending_state: Mutex<Option<String>>,
    /// Latest credential produced by the redirect-return page.
    pub issued: watch::Sender<Option<Credential>>,
    pub session: Option<SessionHandle>,
}

impl AppState {
    pub fn new(config: Config, store: TokenStore, session: Option<SessionHandle>) -> Self {
        let http = reqwest::Client::new();
        let flow = AuthFlow::with_client(config.clone(), store.clone(), http.clone());
        let (issued, _) = watch::channel(None);
        AppState {
            config,
            flow,
            store,
            http,
            pending_state: Mutex::new(None),
            issued,
            session,
        }
    }

    /// Remembers the state of a login that is about to redirect.
    pub async fn expect_state(&self, state: String) {
        *self.pending_state.lock().await = Some(state);
    }
}

/// Minimal HTML page that navigates to `target` after `delay_secs`.
pub(crate) fn redirect_page(title: &str, message: &str, target: &str, delay_secs: u64) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"{delay};url={target}\">\
         <title>{title}</title></head>\
         <body><h2>{title}</h2><p>{message}</p></body></html>",
        delay = delay_secs,
        target = target,
        title = escape(title),
        message = escape(message),
    )
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
