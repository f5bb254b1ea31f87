//! Playback engine that remote-controls a Spotify Connect device through
//! the Web API.
//!
//! `connect()` checks the credential and starts a poller. The poller looks
//! for a device (the configured name, else the active one, else the first
//! listed), reports it `Ready`, and from then on mirrors `GET /me/player`
//! as state changes. A device that vanishes from the list is reported
//! `NotReady`. Provider rejections are mapped onto the engine error classes.

use std::{
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{
    spotify::{ApiError, ProviderApi, SpotifyApi},
    types::{Credential, Device, Track},
};

use super::engine::{
    EngineErrorKind, EngineEvent, EngineState, EventSink, PlaybackEngine, PlaybackEngineFactory,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct WebApiEngineFactory {
    api: SpotifyApi,
    device_name: Option<String>,
    poll_interval: Duration,
}

impl WebApiEngineFactory {
    pub fn new(api: SpotifyApi, device_name: Option<String>) -> Self {
        WebApiEngineFactory {
            api,
            device_name,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl PlaybackEngineFactory for WebApiEngineFactory {
    fn create(&self, credential: &Credential, events: EventSink) -> Arc<dyn PlaybackEngine> {
        Arc::new(WebApiEngine {
            shared: Arc::new(Shared {
                api: self.api.clone(),
                credential: credential.clone(),
                events,
                device_name: self.device_name.clone(),
                device: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
            poll_interval: self.poll_interval,
            poller: Mutex::new(None),
        })
    }
}

struct Shared {
    api: SpotifyApi,
    credential: Credential,
    events: EventSink,
    device_name: Option<String>,
    device: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl Shared {
    fn device(&self) -> Option<String> {
        self.device.lock().ok().and_then(|d| d.clone())
    }

    fn set_device(&self, device: Option<String>) {
        if let Ok(mut slot) = self.device.lock() {
            *slot = device;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reports a provider failure. Returns `true` when polling must stop.
    fn report(&self, error: &ApiError, during: &str) -> bool {
        let Some(kind) = classify(error) else {
            log::debug!("{} failed: {}", during, error);
            return false;
        };
        self.events.emit(EngineEvent::Error {
            kind,
            message: error.to_string(),
        });
        matches!(
            kind,
            EngineErrorKind::Authentication | EngineErrorKind::Account
        )
    }

    fn pick_device<'a>(&self, devices: &'a [Device]) -> Option<&'a Device> {
        let usable = || devices.iter().filter(|d| d.id.is_some());
        if let Some(name) = &self.device_name {
            return usable().find(|d| d.name.eq_ignore_ascii_case(name));
        }
        usable().find(|d| d.is_active).or_else(|| usable().next())
    }

    /// One poll round. Returns `false` once polling must stop.
    async fn poll(&self) -> bool {
        let devices = match self.api.devices(&self.credential).await {
            Ok(devices) => devices,
            Err(e) => return !self.report(&e, "device lookup"),
        };

        let current = self.device();
        let still_listed = current
            .as_deref()
            .map(|id| devices.iter().any(|d| d.id.as_deref() == Some(id)))
            .unwrap_or(false);

        if let Some(id) = current.filter(|_| !still_listed) {
            self.set_device(None);
            self.events.emit(EngineEvent::NotReady { device_id: id });
        }

        if self.device().is_none() {
            match self.pick_device(&devices).and_then(|d| d.id.clone()) {
                Some(id) => {
                    self.set_device(Some(id.clone()));
                    self.events.emit(EngineEvent::Ready { device_id: id });
                }
                None => return true,
            }
        }

        match self.api.playback_state(&self.credential).await {
            Ok(playback) => {
                let state = playback.map(|p| EngineState {
                    track: p.item.map(Track::from),
                    paused: !p.is_playing,
                });
                self.events.emit(EngineEvent::StateChanged(state));
                true
            }
            Err(e) => !self.report(&e, "playback state"),
        }
    }
}

/// Maps a provider failure onto an engine error class.
///
/// `None` for transport failures, rate limiting, server errors and the
/// cloud playback quirk, which are retried on the next poll instead.
fn classify(error: &ApiError) -> Option<EngineErrorKind> {
    if error.is_cloud_playback() {
        return None;
    }
    match error {
        ApiError::Status { status: 401, .. } => Some(EngineErrorKind::Authentication),
        ApiError::Status { status: 403, .. } => Some(EngineErrorKind::Account),
        ApiError::Status { status, .. } if *status == 429 || *status >= 500 => None,
        ApiError::Status { .. } | ApiError::Decode(_) => Some(EngineErrorKind::Playback),
        ApiError::Transport(_) => None,
    }
}

pub struct WebApiEngine {
    shared: Arc<Shared>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl WebApiEngine {
    async fn control<F, Fut>(&self, what: &str, call: F)
    where
        F: FnOnce(SpotifyApi, Credential, Option<String>) -> Fut + Send,
        Fut: Future<Output = Result<(), ApiError>> + Send,
    {
        let shared = &self.shared;
        if shared.is_closed() {
            return;
        }
        if let Err(e) = call(shared.api.clone(), shared.credential.clone(), shared.device()).await {
            shared.report(&e, what);
        }
    }
}

#[async_trait]
impl PlaybackEngine for WebApiEngine {
    async fn connect(&self) -> bool {
        let shared = Arc::clone(&self.shared);
        if let Err(e) = shared.api.current_user(&shared.credential).await {
            let kind = match e.status() {
                Some(401) => EngineErrorKind::Authentication,
                Some(403) => EngineErrorKind::Account,
                _ => EngineErrorKind::Initialization,
            };
            shared.events.emit(EngineEvent::Error {
                kind,
                message: e.to_string(),
            });
            return false;
        }

        if shared.is_closed() {
            return false;
        }

        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if shared.is_closed() || !shared.poll().await {
                    break;
                }
            }
        });

        if let Ok(mut poller) = self.poller.lock() {
            *poller = Some(handle);
        }
        true
    }

    async fn disconnect(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let handle = self.poller.lock().ok().and_then(|mut p| p.take());
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn pause(&self) {
        self.control("pause", |api, c, d| async move { api.pause(&c, d.as_deref()).await })
            .await
    }

    async fn resume(&self) {
        self.control("resume", |api, c, d| async move { api.resume(&c, d.as_deref()).await })
            .await
    }

    async fn next_track(&self) {
        self.control("next", |api, c, d| async move { api.next(&c, d.as_deref()).await })
            .await
    }

    async fn previous_track(&self) {
        self.control("previous", |api, c, d| async move {
            api.previous(&c, d.as_deref()).await
        })
        .await
    }

    async fn set_volume(&self, volume: f32) {
        let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u8;
        self.control("volume", move |api, c, d| async move {
            api.set_volume(&c, percent, d.as_deref()).await
        })
        .await
    }
}
