use tokio::sync::{mpsc, watch};

use crate::types::Credential;

use super::{SessionInput, SessionView};

/// Cloneable control surface of a running [`Session`](super::Session).
///
/// Every method only queues an input. The session applies inputs in order,
/// so a `logout()` issued after a `play_uri()` is always applied after it.
/// Sends to a stopped session are ignored.
#[derive(Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<SessionInput>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub(super) fn new(
        inbox: mpsc::UnboundedSender<SessionInput>,
        view: watch::Receiver<SessionView>,
    ) -> Self {
        SessionHandle { inbox, view }
    }

    fn send(&self, input: SessionInput) {
        if self.inbox.send(input).is_err() {
            log::debug!("session is gone, input dropped");
        }
    }

    /// Latest published read model.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn engine_loaded(&self) {
        self.send(SessionInput::EngineLoaded);
    }

    pub fn credential_issued(&self, credential: Credential) {
        self.send(SessionInput::CredentialIssued(credential));
    }

    pub fn login(&self) {
        self.send(SessionInput::Login);
    }

    pub fn logout(&self) {
        self.send(SessionInput::Logout);
    }

    pub fn play_uri(&self, uri: impl Into<String>) {
        self.send(SessionInput::Play(uri.into()));
    }

    pub fn pause(&self) {
        self.send(SessionInput::Pause);
    }

    pub fn resume(&self) {
        self.send(SessionInput::Resume);
    }

    pub fn skip_next(&self) {
        self.send(SessionInput::Next);
    }

    pub fn skip_previous(&self) {
        self.send(SessionInput::Previous);
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(SessionInput::SetVolume(volume));
    }

    /// Stops the session loop. The adapter is disconnected on the way out.
    pub fn shutdown(&self) {
        self.send(SessionInput::Shutdown);
    }
}
