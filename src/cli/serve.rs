use std::sync::Arc;

use crate::{
    api::AppState,
    config::Config,
    error, info,
    playback::WebApiEngineFactory,
    server,
    session::{Navigator, Route, Session},
};

use super::Context;

/// The server front end has no view of its own to move; it only tells the
/// operator where to go.
struct ServerNavigator {
    home: String,
}

impl Navigator for ServerNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Authorize(url) => info!("Authorize at {}", url),
            Route::Home => info!("Session ended, log in again at {}/login", self.home),
        }
    }
}

/// Runs the local server with a session behind it until Ctrl-C.
pub async fn serve(config: Config) {
    let ctx = Context::new(config);
    let home = format!("http://{}", ctx.config.server_addr);

    let factory = WebApiEngineFactory::new(ctx.api.clone(), ctx.config.device_name.clone());
    let session = Session::new(
        ctx.config.clone(),
        ctx.store.clone(),
        Arc::clone(&ctx.provider),
        Arc::new(factory),
        Arc::new(ServerNavigator { home: home.clone() }),
    );
    let handle = session.handle();
    let running = tokio::spawn(session.run());
    handle.engine_loaded();

    let state = Arc::new(AppState::new(
        ctx.config.clone(),
        ctx.store.clone(),
        Some(handle.clone()),
    ));

    info!("Serving on {}", home);
    tokio::select! {
        result = server::start_api_server(state) => {
            if let Err(e) = result {
                handle.shutdown();
                error!("Server failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
    }

    handle.shutdown();
    if let Err(e) = running.await {
        log::warn!("session task ended abnormally: {}", e);
    }
}
