use std::{sync::Arc, time::Duration};

use tabled::Table;
use tokio::{sync::watch, time::timeout};

use crate::{
    config::Config,
    error, info,
    playback::WebApiEngineFactory,
    session::{Navigator, Route, Session, SessionHandle, SessionPhase, SessionView},
    success,
    types::{ConnectionStatus, TrackTableRow},
    warning,
};

use super::{Context, auth::spinner};

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const STATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play(String),
    Pause,
    Resume,
    Next,
    Previous,
    /// Percent, 0 to 100.
    Volume(u8),
    Now,
}

/// Terminal navigation: the authorization page goes to the browser, the
/// landing view becomes a hint.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Authorize(url) => {
                if webbrowser::open(url.as_str()).is_err() {
                    warning!("Failed to open browser, open this URL manually: {}", url);
                }
            }
            Route::Home => warning!("Session ended, run auth to log in again"),
        }
    }
}

/// Waits until the device is ready or the session gave up.
async fn wait_ready(view: &mut watch::Receiver<SessionView>) -> Option<String> {
    loop {
        if view.changed().await.is_err() {
            return None;
        }
        let current = view.borrow_and_update().clone();
        match (current.phase, current.connection) {
            (SessionPhase::LoggedOut, _) => return None,
            (SessionPhase::Live, ConnectionStatus::Ready(device)) => return Some(device),
            _ => {}
        }
    }
}

/// Runs one player command through a short-lived session.
pub async fn player(config: Config, command: PlayerCommand) {
    let ctx = Context::new(config);
    if ctx.store.load().await.is_none() {
        error!("Not logged in, run auth first");
    }

    let factory = WebApiEngineFactory::new(ctx.api.clone(), ctx.config.device_name.clone());
    let session = Session::new(
        ctx.config.clone(),
        ctx.store.clone(),
        Arc::clone(&ctx.provider),
        Arc::new(factory),
        Arc::new(TerminalNavigator),
    );
    let handle = session.handle();
    let mut view = handle.subscribe();
    let running = tokio::spawn(session.run());
    handle.engine_loaded();

    let spinner = spinner("Connecting to player...");
    let ready = timeout(READY_TIMEOUT, wait_ready(&mut view)).await;
    spinner.finish_and_clear();

    let device = match ready {
        Ok(Some(device)) => device,
        Ok(None) => {
            stop(handle, running).await;
            error!("Credential rejected or no player available, run auth again");
        }
        Err(_) => {
            stop(handle, running).await;
            error!("No Spotify device became ready, open Spotify on one of your devices");
        }
    };
    info!("Using device {}", device);

    match command {
        PlayerCommand::Play(uri) => {
            handle.play_uri(uri.clone());
            success!("Playback of {} requested", uri);
        }
        PlayerCommand::Pause => {
            handle.pause();
            success!("Paused");
        }
        PlayerCommand::Resume => {
            handle.resume();
            success!("Resumed");
        }
        PlayerCommand::Next => {
            handle.skip_next();
            success!("Skipped to next track");
        }
        PlayerCommand::Previous => {
            handle.skip_previous();
            success!("Back to previous track");
        }
        PlayerCommand::Volume(percent) => {
            handle.set_volume(f32::from(percent.min(100)) / 100.0);
            success!("Volume set to {}%", percent.min(100));
        }
        PlayerCommand::Now => now(&mut view).await,
    }

    stop(handle, running).await;
}

async fn now(view: &mut watch::Receiver<SessionView>) {
    let found = timeout(
        STATE_TIMEOUT,
        view.wait_for(|v| v.playback.current_track.is_some()),
    )
    .await
    .ok()
    .and_then(|r| r.ok())
    .map(|v| v.playback.clone());

    match found.and_then(|p| p.current_track.map(|t| TrackTableRow::new(&t, p.is_playing))) {
        Some(row) => println!("{}", Table::new(vec![row])),
        None => info!("Nothing is playing"),
    }
}

async fn stop(handle: SessionHandle, running: tokio::task::JoinHandle<()>) {
    handle.shutdown();
    if let Err(e) = running.await {
        log::warn!("session task ended abnormally: {}", e);
    }
}
