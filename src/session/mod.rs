//! # Session Module
//!
//! The playback session state machine. A [`Session`] owns the live
//! credential, at most one [`PlaybackAdapter`], and the read model every
//! front end renders ([`SessionView`]).
//!
//! ```text
//!            init / credential_issued
//! LoggedOut ─────────────────────────► Authenticating
//!    ▲                                      │ validated
//!    │ logout / invalidation                ▼
//!    ├──────────────────────────────── AwaitingEngine
//!    │                                      │ engine loaded + valid credential
//!    │                                      ▼
//!    └─────────────────────────────────── Live { Connecting | Ready(device) }
//! ```
//!
//! All inputs (handle commands, engine notifications, async results) flow
//! through one unbounded inbox and are applied one at a time by
//! [`Session::run`] or [`Session::step`]. Validation and engine connection
//! run on spawned tasks that report back through the same inbox:
//!
//! - validation results carry the epoch they were started in and are
//!   dropped once a newer credential or a logout bumped the epoch;
//! - adapter notifications and connect results carry the adapter id and
//!   are dropped once that adapter is gone.
//!
//! Errors never escape the session. Every failure resolves to `LoggedOut`
//! or to the current `Live` state.

mod handle;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use url::Url;

use crate::{
    config::Config,
    management::TokenStore,
    playback::{
        AdapterId, AdapterNotice, EngineErrorKind, EventSink, Notification, PlaybackAdapter,
        PlaybackEngineFactory,
    },
    spotify::{
        ProviderApi,
        auth::{self, AuthError, AuthorizationRequest},
    },
    types::{ConnectionStatus, Credential, PlaybackState},
};

pub use handle::SessionHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    LoggedOut,
    Authenticating,
    AwaitingEngine,
    Live,
}

/// Read model published to display collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub connection: ConnectionStatus,
    pub playback: PlaybackState,
}

impl SessionView {
    pub fn device_id(&self) -> Option<&str> {
        self.connection.device_id()
    }

    pub fn is_logged_in(&self) -> bool {
        self.phase != SessionPhase::LoggedOut
    }
}

/// Navigation targets the session may request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The landing view.
    Home,
    /// The provider's authorization page.
    Authorize(Url),
}

/// Moves the user between views. Supplied by the front end.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for front ends that have nowhere to go.
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn navigate(&self, route: Route) {
        log::debug!("navigation to {:?} ignored", route);
    }
}

#[derive(Debug)]
enum SessionInput {
    EngineLoaded,
    CredentialIssued(Credential),
    Login,
    Logout,
    Play(String),
    Pause,
    Resume,
    Next,
    Previous,
    SetVolume(f32),
    Validated {
        epoch: u64,
        credential: Credential,
        valid: bool,
    },
    ConnectFinished {
        adapter: AdapterId,
        connected: bool,
    },
    Adapter(AdapterNotice),
    Shutdown,
}

pub struct Session {
    config: Config,
    store: TokenStore,
    provider: Arc<dyn ProviderApi>,
    factory: Arc<dyn PlaybackEngineFactory>,
    navigator: Arc<dyn Navigator>,

    phase: SessionPhase,
    credential: Option<Credential>,
    engine_loaded: bool,
    adapter: Option<PlaybackAdapter>,
    next_adapter: AdapterId,
    epoch: u64,
    connection: ConnectionStatus,
    playback: PlaybackState,

    inbox_tx: mpsc::UnboundedSender<SessionInput>,
    inbox_rx: mpsc::UnboundedReceiver<SessionInput>,
    view_tx: watch::Sender<SessionView>,
}

impl Session {
    pub fn new(
        config: Config,
        store: TokenStore,
        provider: Arc<dyn ProviderApi>,
        factory: Arc<dyn PlaybackEngineFactory>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(SessionView::default());
        Session {
            config,
            store,
            provider,
            factory,
            navigator,
            phase: SessionPhase::LoggedOut,
            credential: None,
            engine_loaded: false,
            adapter: None,
            next_adapter: 1,
            epoch: 0,
            connection: ConnectionStatus::Disconnected,
            playback: PlaybackState::default(),
            inbox_tx,
            inbox_rx,
            view_tx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.inbox_tx.clone(), self.view_tx.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            connection: self.connection.clone(),
            playback: self.playback.clone(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn adapter(&self) -> Option<&PlaybackAdapter> {
        self.adapter.as_ref()
    }

    /// Runs the session until [`SessionHandle::shutdown`] is called.
    pub async fn run(mut self) {
        self.init().await;
        while self.step().await {}
        self.teardown().await;
    }

    /// Waits for the next input and applies it.
    ///
    /// Returns `false` once a shutdown was requested.
    pub async fn step(&mut self) -> bool {
        match self.inbox_rx.recv().await {
            Some(SessionInput::Shutdown) | None => false,
            Some(input) => {
                self.apply(input).await;
                true
            }
        }
    }

    /// Applies every input that is already queued, without waiting.
    pub async fn drain(&mut self) -> bool {
        while let Ok(input) = self.inbox_rx.try_recv() {
            if matches!(input, SessionInput::Shutdown) {
                return false;
            }
            self.apply(input).await;
        }
        true
    }

    /// Startup: pick up a persisted credential, if any, and validate it.
    pub async fn init(&mut self) {
        match self.store.load().await {
            Some(credential) => {
                log::debug!("found stored credential, validating");
                self.adopt(credential).await;
            }
            None => {
                log::debug!("no stored credential");
                self.reset().await;
            }
        }
    }

    /// Signals that the playback engine is available.
    pub fn engine_loaded(&mut self) {
        self.engine_loaded = true;
        self.try_start_engine();
    }

    /// Adopts a credential produced by the auth flow.
    pub async fn credential_issued(&mut self, credential: Credential) {
        if self.credential.as_ref() == Some(&credential) && self.phase != SessionPhase::LoggedOut {
            return;
        }
        self.adopt(credential).await;
    }

    /// Clears any credential and asks the navigator to open the
    /// authorization page.
    ///
    /// Nothing is cleared when the configuration is incomplete.
    pub async fn login(&mut self) -> Result<AuthorizationRequest, AuthError> {
        let request = auth::build_authorization_url(&self.config).map_err(|e| {
            log::error!("cannot start login: {}", e);
            AuthError::from(e)
        })?;

        self.invalidate("login requested").await;
        self.navigator.navigate(Route::Authorize(request.url.clone()));
        Ok(request)
    }

    pub async fn logout(&mut self) {
        self.invalidate("logout").await;
    }

    pub async fn play_uri(&self, uri: &str) {
        if let Some(adapter) = &self.adapter {
            adapter.play_uri(uri).await;
        }
    }

    pub async fn pause(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.pause().await;
        }
    }

    pub async fn resume(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.resume().await;
        }
    }

    pub async fn skip_next(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.skip_next().await;
        }
    }

    pub async fn skip_previous(&self) {
        if let Some(adapter) = &self.adapter {
            adapter.skip_previous().await;
        }
    }

    pub async fn set_volume(&self, volume: f32) {
        if let Some(adapter) = &self.adapter {
            adapter.set_volume(volume).await;
        }
    }

    /// Disconnects the adapter. The stored credential is kept.
    pub async fn teardown(&mut self) {
        self.drop_adapter().await;
        self.connection = ConnectionStatus::Disconnected;
        self.playback = PlaybackState::default();
        self.publish();
    }

    async fn apply(&mut self, input: SessionInput) {
        match input {
            SessionInput::EngineLoaded => self.engine_loaded(),
            SessionInput::CredentialIssued(credential) => self.credential_issued(credential).await,
            SessionInput::Login => {
                let _ = self.login().await;
            }
            SessionInput::Logout => self.logout().await,
            SessionInput::Play(uri) => self.play_uri(&uri).await,
            SessionInput::Pause => self.pause().await,
            SessionInput::Resume => self.resume().await,
            SessionInput::Next => self.skip_next().await,
            SessionInput::Previous => self.skip_previous().await,
            SessionInput::SetVolume(volume) => self.set_volume(volume).await,
            SessionInput::Validated {
                epoch,
                credential,
                valid,
            } => self.on_validated(epoch, credential, valid).await,
            SessionInput::ConnectFinished { adapter, connected } => {
                self.on_connect_finished(adapter, connected).await
            }
            SessionInput::Adapter(notice) => self.on_notice(notice).await,
            SessionInput::Shutdown => {}
        }
    }

    /// Makes `credential` the live one and starts validating it.
    async fn adopt(&mut self, credential: Credential) {
        self.drop_adapter().await;
        self.epoch += 1;
        self.credential = Some(credential.clone());
        self.phase = SessionPhase::Authenticating;
        self.connection = ConnectionStatus::Disconnected;
        self.playback = PlaybackState::default();
        self.publish();

        let epoch = self.epoch;
        let store = self.store.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let valid = store.validate(&credential).await;
            let _ = inbox.send(SessionInput::Validated {
                epoch,
                credential,
                valid,
            });
        });
    }

    async fn on_validated(&mut self, epoch: u64, credential: Credential, valid: bool) {
        if epoch != self.epoch || self.credential.as_ref() != Some(&credential) {
            log::debug!("dropping stale validation result (epoch {})", epoch);
            return;
        }
        if self.phase != SessionPhase::Authenticating {
            return;
        }

        if valid {
            self.phase = SessionPhase::AwaitingEngine;
            self.publish();
            self.try_start_engine();
        } else {
            self.reject_credential("credential validation failed").await;
        }
    }

    /// Builds and connects an adapter once both the engine and a validated
    /// credential are present. Safe to call on every signal.
    fn try_start_engine(&mut self) {
        if self.phase != SessionPhase::AwaitingEngine || !self.engine_loaded {
            return;
        }
        if self.adapter.is_some() {
            return;
        }
        let Some(credential) = self.credential.clone() else {
            return;
        };

        let id = self.next_adapter;
        self.next_adapter += 1;

        let inbox = self.inbox_tx.clone();
        let sink = EventSink::new(id, move |notice| {
            let _ = inbox.send(SessionInput::Adapter(notice));
        });
        let mut adapter = PlaybackAdapter::new(
            self.factory.as_ref(),
            credential,
            Arc::clone(&self.provider),
            sink,
        );

        if let Some(ticket) = adapter.begin_connect() {
            let inbox = self.inbox_tx.clone();
            tokio::spawn(async move {
                let adapter = ticket.adapter();
                let connected = ticket.run().await;
                let _ = inbox.send(SessionInput::ConnectFinished { adapter, connected });
            });
        }

        log::debug!("adapter {} connecting", id);
        self.adapter = Some(adapter);
        self.phase = SessionPhase::Live;
        self.connection = ConnectionStatus::Connecting;
        self.playback = PlaybackState::default();
        self.publish();
    }

    fn is_current(&self, adapter: AdapterId) -> bool {
        self.adapter.as_ref().map(|a| a.id()) == Some(adapter)
    }

    async fn on_connect_finished(&mut self, adapter: AdapterId, connected: bool) {
        if !self.is_current(adapter) {
            log::debug!("dropping connect result of adapter {}", adapter);
            return;
        }
        if let Some(current) = self.adapter.as_mut() {
            current.finish_connect(connected);
        }

        if connected {
            log::info!("player connected");
        } else {
            self.connection = ConnectionStatus::Failed("engine failed to connect".into());
            self.publish();
            self.reject_credential("engine failed to connect").await;
        }
    }

    async fn on_notice(&mut self, notice: AdapterNotice) {
        if !self.is_current(notice.adapter) || self.phase != SessionPhase::Live {
            log::debug!("dropping notification of adapter {}", notice.adapter);
            return;
        }

        match notice.notification {
            Notification::Ready { device_id } => self.on_ready(device_id),
            Notification::NotReady { device_id } => {
                log::info!("device {} went offline", device_id);
                if let Some(adapter) = self.adapter.as_mut() {
                    adapter.set_device(None);
                }
                self.connection = ConnectionStatus::Connecting;
                self.playback = PlaybackState::default();
                self.publish();
            }
            Notification::StateChanged { track, paused } => {
                if !matches!(self.connection, ConnectionStatus::Ready(_)) {
                    return;
                }
                self.playback = PlaybackState {
                    current_track: track,
                    is_playing: !paused,
                };
                self.publish();
            }
            Notification::Error { kind, message } => self.on_engine_error(kind, message).await,
        }
    }

    fn on_ready(&mut self, device_id: String) {
        log::info!("player ready on device {}", device_id);
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_device(Some(device_id.clone()));
        }
        self.connection = ConnectionStatus::Ready(device_id.clone());
        self.publish();

        let Some(credential) = self.credential.clone() else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        tokio::spawn(async move {
            match provider.transfer_playback(&credential, &device_id, false).await {
                Ok(()) => {}
                Err(e) if e.is_cloud_playback() => {
                    log::debug!("cloud playback error on transfer ignored: {}", e)
                }
                Err(e) => log::warn!("cannot transfer playback to {}: {}", device_id, e),
            }
        });
    }

    async fn on_engine_error(&mut self, kind: EngineErrorKind, message: String) {
        match kind {
            EngineErrorKind::Authentication => {
                log::error!("authentication error: {}", message);
                self.reject_credential("engine authentication error").await;
                self.navigator.navigate(Route::Home);
            }
            EngineErrorKind::Account if is_premium_restriction(&message) => {
                log::warn!("premium account required for playback: {}", message);
            }
            EngineErrorKind::Account => {
                log::error!("account error: {}", message);
                self.reject_credential("engine account error").await;
            }
            EngineErrorKind::Initialization => {
                log::error!("initialization error: {}", message);
                self.reject_credential("engine initialization error").await;
            }
            EngineErrorKind::Playback => log::warn!("playback error: {}", message),
        }
    }

    /// Clears the stored credential and returns to `LoggedOut`.
    async fn invalidate(&mut self, reason: &str) {
        log::debug!("invalidating session: {}", reason);
        if let Err(e) = self.store.clear().await {
            log::warn!("cannot clear stored credential: {}", e);
        }
        self.reset().await;
    }

    /// Drops the live credential after the provider or engine rejected it.
    ///
    /// Storage is only cleared while it still holds that credential, so a
    /// newer one persisted by the auth flow survives.
    async fn reject_credential(&mut self, reason: &str) {
        log::debug!("rejecting credential: {}", reason);
        if let Some(credential) = self.credential.clone() {
            match self.store.clear_if(&credential).await {
                Ok(true) => {}
                Ok(false) => log::debug!("stored credential changed, keeping it"),
                Err(e) => log::warn!("cannot clear stored credential: {}", e),
            }
        }
        self.reset().await;
    }

    async fn reset(&mut self) {
        self.drop_adapter().await;
        self.epoch += 1;
        self.credential = None;
        self.phase = SessionPhase::LoggedOut;
        self.connection = ConnectionStatus::Disconnected;
        self.playback = PlaybackState::default();
        self.publish();
    }

    async fn drop_adapter(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.disconnect().await;
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

/// True when an account error only means playback needs a premium plan.
pub fn is_premium_restriction(message: &str) -> bool {
    message.to_lowercase().contains("premium")
}
