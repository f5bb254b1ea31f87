//! Playback engine capability.
//!
//! The engine does the actual streaming. The player never constructs one
//! directly: it asks an injected [`PlaybackEngineFactory`] for an instance
//! bound to the current credential and hands it an [`EventSink`] to report
//! lifecycle and state changes through.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::types::{Credential, Track};

/// Error classes an engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    Initialization,
    Authentication,
    Account,
    Playback,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineErrorKind::Initialization => "initialization",
            EngineErrorKind::Authentication => "authentication",
            EngineErrorKind::Account => "account",
            EngineErrorKind::Playback => "playback",
        };
        f.write_str(name)
    }
}

/// Player state as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub track: Option<Track>,
    pub paused: bool,
}

/// Raw event emitted by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Ready { device_id: String },
    NotReady { device_id: String },
    /// `None` when the engine has no state to report.
    StateChanged(Option<EngineState>),
    Error { kind: EngineErrorKind, message: String },
}

/// Normalized notification delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Ready { device_id: String },
    NotReady { device_id: String },
    StateChanged { track: Option<Track>, paused: bool },
    Error { kind: EngineErrorKind, message: String },
}

impl Notification {
    /// Maps an engine event, dropping state changes that carry no state.
    pub fn from_event(event: EngineEvent) -> Option<Self> {
        match event {
            EngineEvent::Ready { device_id } => Some(Notification::Ready { device_id }),
            EngineEvent::NotReady { device_id } => Some(Notification::NotReady { device_id }),
            EngineEvent::StateChanged(Some(state)) => Some(Notification::StateChanged {
                track: state.track,
                paused: state.paused,
            }),
            EngineEvent::StateChanged(None) => None,
            EngineEvent::Error { kind, message } => Some(Notification::Error { kind, message }),
        }
    }
}

/// Identifies one adapter instance for the lifetime of the process.
pub type AdapterId = u64;

/// A notification stamped with the adapter instance that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterNotice {
    pub adapter: AdapterId,
    pub notification: Notification,
}

type Deliver = dyn Fn(AdapterNotice) + Send + Sync;

/// Where an engine reports its events.
///
/// Each sink belongs to exactly one adapter. Events are normalized and
/// stamped on the way through, so consumers can tell stale instances apart.
#[derive(Clone)]
pub struct EventSink {
    adapter: AdapterId,
    deliver: Arc<Deliver>,
}

impl EventSink {
    pub fn new<F>(adapter: AdapterId, deliver: F) -> Self
    where
        F: Fn(AdapterNotice) + Send + Sync + 'static,
    {
        EventSink {
            adapter,
            deliver: Arc::new(deliver),
        }
    }

    pub fn adapter(&self) -> AdapterId {
        self.adapter
    }

    pub fn emit(&self, event: EngineEvent) {
        match Notification::from_event(event) {
            Some(notification) => (self.deliver)(AdapterNotice {
                adapter: self.adapter,
                notification,
            }),
            None => log::trace!("adapter {}: dropped empty state change", self.adapter),
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

/// One playback engine instance.
///
/// Controls are best-effort. Failures are reported through the event sink,
/// not returned.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Connects to the provider. Resolves to `false` on failure.
    async fn connect(&self) -> bool;

    /// Releases the engine. Must be safe to call more than once.
    async fn disconnect(&self);

    async fn pause(&self);

    async fn resume(&self);

    async fn next_track(&self);

    async fn previous_track(&self);

    /// `volume` is within `0.0..=1.0`.
    async fn set_volume(&self, volume: f32);
}

/// Creates engines bound to a credential.
pub trait PlaybackEngineFactory: Send + Sync {
    fn create(&self, credential: &Credential, events: EventSink) -> Arc<dyn PlaybackEngine>;
}
