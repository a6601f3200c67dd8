//! Bunker Countdown - persisted countdown deadlines with a local HTTP host
//!
//! This is the main entry point for the bunker-countdown application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use bunker_countdown::{
    api::create_router,
    audio::{AudioCue, Muted, TerminalBell},
    clock::SystemClock,
    config::Config,
    engine::EngineContext,
    state::AppState,
    store::{DeadlineStore, FileStore, MemoryStore},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("bunker_countdown={},tower_http=info", config.log_level()))
        .init();

    info!("Starting bunker-countdown server v{}", env!("CARGO_PKG_VERSION"));

    // Bad durations stop us here, never mid-countdown
    config.validate()?;
    let presets = config.presets()?;

    let store: Arc<dyn DeadlineStore> = if config.ephemeral {
        info!("Using in-memory deadline store");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.store_path();
        info!("Using deadline store at {}", path.display());
        Arc::new(FileStore::new(path))
    };
    let audio: Arc<dyn AudioCue> = if config.mute {
        Arc::new(Muted)
    } else {
        Arc::new(TerminalBell)
    };
    let context = EngineContext {
        store,
        clock: Arc::new(SystemClock),
        audio,
    };

    // Create application state
    let state = Arc::new(AppState::new(config.port, config.host.clone(), context));

    for preset in &presets {
        let snapshot = state.mount(preset.key, preset.duration)?;
        info!("Timer {}: {} remaining", preset.key, snapshot.display);
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers             - List mounted timers");
    info!("  PUT    /timers/:key        - Mount a timer");
    info!("  GET    /timers/:key        - Current countdown for a timer");
    info!("  DELETE /timers/:key        - Unmount a timer");
    info!("  POST   /timers/:key/dismiss - Close the open modal");
    info!("  POST   /timers/:key/restart - Start a fresh window");
    info!("  GET    /status             - Host status and all timers");
    info!("  GET    /health             - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.unmount_all().await;
    info!("Server shutdown complete");
    Ok(())
}
