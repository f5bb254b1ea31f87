//! # Playback Module
//!
//! Everything between the session and the component that actually streams
//! audio.
//!
//! - [`engine`] - the injected engine capability ([`PlaybackEngine`],
//!   [`PlaybackEngineFactory`]) and its closed event vocabulary
//! - [`adapter`] - [`PlaybackAdapter`], which owns one engine instance,
//!   enforces its lifecycle and silently drops controls while disconnected
//! - [`webapi`] - an engine that remote-controls a Spotify Connect device
//!   through the Web API
//!
//! Engines report through an [`EventSink`]. The sink normalizes raw
//! [`EngineEvent`]s into [`Notification`]s, stamps them with the adapter id
//! and pushes them into the session's inbox.

pub mod adapter;
pub mod engine;
pub mod webapi;

pub use adapter::{AdapterState, ConnectTicket, PlaybackAdapter};
pub use engine::{
    AdapterId, AdapterNotice, EngineErrorKind, EngineEvent, EngineState, EventSink,
    Notification, PlaybackEngine, PlaybackEngineFactory,
};
pub use webapi::{WebApiEngine, WebApiEngineFactory};
