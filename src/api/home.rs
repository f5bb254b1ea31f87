use std::sync::Arc;

use axum::{Extension, response::Html};

use crate::{session::SessionPhase, types::ConnectionStatus};

use super::{AppState, escape};

/// Landing view. Shows the player state or a link to log in.
pub async fn home(Extension(state): Extension<Arc<AppState>>) -> Html<String> {
    let view = state.session.as_ref().map(|s| s.view()).unwrap_or_default();

    let body = match view.phase {
        SessionPhase::LoggedOut => {
            "<p>Not logged in. <a href=\"/login\">Log in</a></p>".to_string()
        }
        SessionPhase::Authenticating => "<p>Checking credential...</p>".to_string(),
        SessionPhase::AwaitingEngine => "<p>Waiting for the player...</p>".to_string(),
        SessionPhase::Live => {
            let mut out = match &view.connection {
                ConnectionStatus::Ready(device) => {
                    format!("<p>Player ready on device <code>{}</code></p>", escape(device))
                }
                other => format!("<p>Player {}</p>", escape(&other.to_string())),
            };
            if let Some(track) = &view.playback.current_track {
                out.push_str(&format!(
                    "<p>{} {} by {}</p>",
                    if view.playback.is_playing { "Playing" } else { "Paused" },
                    escape(&track.name),
                    escape(&track.artists.join(", ")),
                ));
            }
            out.push_str("<p><a href=\"/login\">Switch account</a></p>");
            out
        }
    };

    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{name}</title></head>\
         <body><h1>{name}</h1>{body}</body></html>",
        name = env!("CARGO_PKG_NAME"),
        body = body,
    ))
}
