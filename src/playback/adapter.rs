use std::sync::Arc;

use crate::{spotify::ProviderApi, types::Credential};

use super::engine::{AdapterId, EventSink, PlaybackEngine, PlaybackEngineFactory};

/// Lifecycle of one adapter instance.
///
/// `Uninitialized -> Connecting -> Connected -> Disconnected`, with
/// `ConnectFailed` as a terminal state. A failed adapter is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
    ConnectFailed,
}

/// Pending `connect()` call, detached from the adapter so it can run on
/// its own task while the adapter keeps serving `disconnect()`.
pub struct ConnectTicket {
    adapter: AdapterId,
    engine: Arc<dyn PlaybackEngine>,
}

impl ConnectTicket {
    pub fn adapter(&self) -> AdapterId {
        self.adapter
    }

    pub async fn run(self) -> bool {
        self.engine.connect().await
    }
}

/// Owns one playback engine instance and its lifecycle.
pub struct PlaybackAdapter {
    id: AdapterId,
    engine: Arc<dyn PlaybackEngine>,
    state: AdapterState,
    credential: Credential,
    provider: Arc<dyn ProviderApi>,
    device_id: Option<String>,
}

impl PlaybackAdapter {
    pub fn new(
        factory: &dyn PlaybackEngineFactory,
        credential: Credential,
        provider: Arc<dyn ProviderApi>,
        events: EventSink,
    ) -> Self {
        let id = events.adapter();
        let engine = factory.create(&credential, events);
        PlaybackAdapter {
            id,
            engine,
            state: AdapterState::Uninitialized,
            credential,
            provider,
            device_id: None,
        }
    }

    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn set_device(&mut self, device_id: Option<String>) {
        self.device_id = device_id;
    }

    /// Moves to `Connecting` and hands out the connect call.
    ///
    /// Returns `None` when this instance already attempted a connection.
    pub fn begin_connect(&mut self) -> Option<ConnectTicket> {
        if self.state != AdapterState::Uninitialized {
            log::warn!("adapter {}: connect requested in state {:?}", self.id, self.state);
            return None;
        }

        self.state = AdapterState::Connecting;
        Some(ConnectTicket {
            adapter: self.id,
            engine: Arc::clone(&self.engine),
        })
    }

    /// Applies the outcome of a [`ConnectTicket`].
    ///
    /// Ignored unless the adapter is still `Connecting`, so a result that
    /// arrives after `disconnect()` cannot revive the instance.
    pub fn finish_connect(&mut self, connected: bool) {
        if self.state != AdapterState::Connecting {
            return;
        }
        self.state = if connected {
            AdapterState::Connected
        } else {
            AdapterState::ConnectFailed
        };
    }

    /// Connects in place. Resolves to whether the adapter is now connected.
    pub async fn connect(&mut self) -> bool {
        let Some(ticket) = self.begin_connect() else {
            return false;
        };
        let connected = ticket.run().await;
        self.finish_connect(connected);
        self.state == AdapterState::Connected
    }

    /// Releases the engine. Always permitted and idempotent.
    pub async fn disconnect(&mut self) {
        if matches!(self.state, AdapterState::Disconnected) {
            return;
        }
        log::debug!("adapter {}: disconnecting from {:?}", self.id, self.state);
        self.engine.disconnect().await;
        self.state = AdapterState::Disconnected;
        self.device_id = None;
    }

    fn is_connected(&self) -> bool {
        self.state == AdapterState::Connected
    }

    pub async fn pause(&self) {
        if self.is_connected() {
            self.engine.pause().await;
        }
    }

    pub async fn resume(&self) {
        if self.is_connected() {
            self.engine.resume().await;
        }
    }

    pub async fn skip_next(&self) {
        if self.is_connected() {
            self.engine.next_track().await;
        }
    }

    pub async fn skip_previous(&self) {
        if self.is_connected() {
            self.engine.previous_track().await;
        }
    }

    pub async fn set_volume(&self, volume: f32) {
        if self.is_connected() {
            let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
            self.engine.set_volume(volume).await;
        }
    }

    /// Starts playback of `uri` through the provider's REST API, targeting
    /// this adapter's device when known.
    ///
    /// Failures stay here. The transient cloud playback class is not even
    /// worth a warning.
    pub async fn play_uri(&self, uri: &str) {
        if !self.is_connected() {
            return;
        }

        let result = self
            .provider
            .start_playback(&self.credential, uri, self.device_id.as_deref())
            .await;

        match result {
            Ok(()) => log::debug!("adapter {}: playing {}", self.id, uri),
            Err(e) if e.is_cloud_playback() => {
                log::debug!("adapter {}: cloud playback error ignored: {}", self.id, e)
            }
            Err(e) => log::warn!("adapter {}: cannot play {}: {}", self.id, uri, e),
        }
    }
}

impl Drop for PlaybackAdapter {
    fn drop(&mut self) {
        if matches!(self.state, AdapterState::Disconnected) {
            return;
        }

        let engine = Arc::clone(&self.engine);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { engine.disconnect().await });
            }
            Err(_) => log::warn!("adapter {} dropped without a runtime to release it", self.id),
        }
    }
}
