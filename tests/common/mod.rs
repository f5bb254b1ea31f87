#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use cyberdeejay::{
    config::Config,
    playback::{EventSink, PlaybackEngine, PlaybackEngineFactory},
    session::{Navigator, Route},
    spotify::{ApiError, CLOUD_PLAYBACK_ERROR, ProviderApi},
    types::Credential,
};
use tokio::{net::TcpListener, sync::Notify};

// Configuration built from a fixed key set, with per-test overrides
pub fn config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("SPOTIFY_CLIENT_ID", "client-1"),
        ("SPOTIFY_CLIENT_SECRET", "secret-1"),
        ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8888/callback"),
        ("SPOTIFY_SCOPE", "streaming user-read-email"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

pub fn test_config() -> Config {
    config_with(&[])
}

pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Polls `check` until it holds or two seconds passed.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    CurrentUser(String),
    Transfer { device_id: String, play: bool },
    Play { uri: String, device_id: Option<String> },
}

/// Provider double. Accepts the listed tokens and records every call.
pub struct MockProvider {
    accepted: Mutex<Vec<String>>,
    play_failure: Mutex<Option<(u16, String)>>,
    transfer_failure: Mutex<Option<(u16, String)>>,
    pub calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    pub fn accepting(tokens: &[&str]) -> Arc<Self> {
        Arc::new(MockProvider {
            accepted: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
            play_failure: Mutex::new(None),
            transfer_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn accept(&self, token: &str) {
        self.accepted.lock().unwrap().push(token.to_string());
    }

    pub fn fail_play(&self, status: u16, body: &str) {
        *self.play_failure.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn fail_transfer(&self, status: u16, body: &str) {
        *self.transfer_failure.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn fail_play_with_cloud_error(&self) {
        self.fail_play(
            502,
            &format!(
                "{{\"error\":{{\"status\":502,\"message\":\"{}\"}}}}",
                CLOUD_PLAYBACK_ERROR
            ),
        );
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transfers(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ProviderCall::Transfer { .. }))
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProviderApi for MockProvider {
    async fn current_user(&self, credential: &Credential) -> Result<(), ApiError> {
        self.record(ProviderCall::CurrentUser(credential.as_str().to_string()));
        if self
            .accepted
            .lock()
            .unwrap()
            .iter()
            .any(|t| t == credential.as_str())
        {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 401,
                body: "invalid token".into(),
            })
        }
    }

    async fn transfer_playback(
        &self,
        _credential: &Credential,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError> {
        self.record(ProviderCall::Transfer {
            device_id: device_id.to_string(),
            play,
        });
        match self.transfer_failure.lock().unwrap().clone() {
            Some((status, body)) => Err(ApiError::Status { status, body }),
            None => Ok(()),
        }
    }

    async fn start_playback(
        &self,
        _credential: &Credential,
        uri: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        self.record(ProviderCall::Play {
            uri: uri.to_string(),
            device_id: device_id.map(str::to_string),
        });
        match self.play_failure.lock().unwrap().clone() {
            Some((status, body)) => Err(ApiError::Status { status, body }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Connect,
    Disconnect,
    Pause,
    Resume,
    Next,
    Previous,
    Volume(f32),
}

pub struct MockEngine {
    pub token: String,
    connect_result: bool,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackEngine for MockEngine {
    async fn connect(&self) -> bool {
        self.record(EngineCall::Connect);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.connect_result
    }

    async fn disconnect(&self) {
        self.record(EngineCall::Disconnect);
    }

    async fn pause(&self) {
        self.record(EngineCall::Pause);
    }

    async fn resume(&self) {
        self.record(EngineCall::Resume);
    }

    async fn next_track(&self) {
        self.record(EngineCall::Next);
    }

    async fn previous_track(&self) {
        self.record(EngineCall::Previous);
    }

    async fn set_volume(&self, volume: f32) {
        self.record(EngineCall::Volume(volume));
    }
}

/// Engine factory double. Keeps every engine and sink it handed out.
pub struct MockEngineFactory {
    connect_result: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    engines: Mutex<Vec<Arc<MockEngine>>>,
    sinks: Mutex<Vec<EventSink>>,
}

impl MockEngineFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(MockEngineFactory {
            connect_result: AtomicBool::new(true),
            gate: Mutex::new(None),
            engines: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        let factory = Self::new();
        factory.connect_result.store(false, Ordering::SeqCst);
        factory
    }

    /// Makes `connect()` wait until the returned gate is notified.
    pub fn hold_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> Arc<MockEngine> {
        Arc::clone(&self.engines.lock().unwrap()[index])
    }

    pub fn last_engine(&self) -> Arc<MockEngine> {
        Arc::clone(self.engines.lock().unwrap().last().expect("no engine created"))
    }

    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn last_sink(&self) -> EventSink {
        self.sinks.lock().unwrap().last().expect("no engine created").clone()
    }
}

impl PlaybackEngineFactory for MockEngineFactory {
    fn create(&self, credential: &Credential, events: EventSink) -> Arc<dyn PlaybackEngine> {
        let engine = Arc::new(MockEngine {
            token: credential.as_str().to_string(),
            connect_result: self.connect_result.load(Ordering::SeqCst),
            gate: self.gate.lock().unwrap().clone(),
            calls: Mutex::new(Vec::new()),
        });
        self.engines.lock().unwrap().push(Arc::clone(&engine));
        self.sinks.lock().unwrap().push(events);
        engine
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}
