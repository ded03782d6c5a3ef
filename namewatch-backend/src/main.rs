use namewatch_backend::dispatcher;
use namewatch_backend::{AppState, create_app};
use namewatch_core::Settings;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting namewatch...");

    // Load configuration from environment variables or use defaults
    let config = namewatch_backend::config::Config::from_env();
    tracing::info!(
        "Configuration: port={}, body_limit={}KB, timeout={}s, api_key={}",
        config.port,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
        if config.api_key.is_some() { "set" } else { "unset" }
    );

    let settings = Settings::from_env();
    tracing::info!(
        "Tracker: max_names={}, action={}, tempban={}m, ignore_level={}, notify_level={:?}, log={:?}",
        settings.max_names,
        settings.action,
        settings.tempban_duration.as_secs() / 60,
        settings.ignore_level,
        settings.notify_level,
        settings.log_location
    );

    let reload: dispatcher::Reloader = Box::new(|| {
        let _ = dotenvy::dotenv_override();
        Settings::from_env()
    });
    let (dispatch, outbox) = dispatcher::launch(settings, reload);
    let state = AppState::new(dispatch, outbox, config.api_key.as_deref());
    let app = create_app(state, config.request_body_limit, config.request_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
