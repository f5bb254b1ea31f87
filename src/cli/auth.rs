use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::timeout;

use crate::{api::AppState, config::Config, error, info, server, success, warning};

use super::Context;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Browser login through the local server.
pub async fn auth(config: Config) {
    let ctx = Context::new(config);
    let state = Arc::new(AppState::new(ctx.config.clone(), ctx.store.clone(), None));
    let mut issued = state.issued.subscribe();

    let server_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = server::start_api_server(server_state).await {
            error!("Cannot start local server: {}", e);
        }
    });

    let request = match state.flow.login().await {
        Ok(request) => request,
        Err(e) => error!("Cannot start login: {}", e),
    };
    state.expect_state(request.state.clone()).await;

    info!("Opening browser for authorization...");
    if webbrowser::open(request.url.as_str()).is_err() {
        warning!("Failed to open browser, open this URL manually: {}", request.url);
    }

    let spinner = spinner("Waiting for authorization...");
    let waited = timeout(LOGIN_TIMEOUT, issued.wait_for(|c| c.is_some()))
        .await
        .map(|r| r.map(|_| ()));
    spinner.finish_and_clear();

    match waited {
        Ok(Ok(_)) => success!("Authentication successful!"),
        Ok(Err(_)) => error!("Local server stopped before authorization finished"),
        Err(_) => error!(
            "No authorization within {} seconds, run auth again",
            LOGIN_TIMEOUT.as_secs()
        ),
    }
}

pub async fn logout(config: Config) {
    let ctx = Context::new(config);
    match ctx.store.clear().await {
        Ok(()) => success!("Logged out"),
        Err(e) => error!("Cannot remove stored credential: {}", e),
    }
}

/// Reports whether a usable credential is stored.
pub async fn status(config: Config) {
    let ctx = Context::new(config);
    let Some(credential) = ctx.store.load().await else {
        warning!("Not logged in, run auth first");
        return;
    };

    let spinner = spinner("Checking credential...");
    let valid = ctx.store.validate(&credential).await;
    spinner.finish_and_clear();

    if valid {
        success!("Logged in, credential accepted by Spotify");
    } else {
        warning!("Stored credential was rejected, run auth again");
    }
}
