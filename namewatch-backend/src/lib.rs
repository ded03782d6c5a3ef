pub mod config;
pub mod dispatcher;
mod error;
pub mod helpers;
pub mod outbox;
pub mod roster;
mod routes;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::dispatcher::DispatchHandle;
use crate::outbox::Outbox;

pub use crate::error::{AppError, ErrorResponse};

pub struct AppState {
    pub dispatch: DispatchHandle,
    pub outbox: Arc<Outbox>,
    /// SHA-256 of the key the game server must present. None leaves the API open.
    pub api_key_hash: Option<String>,
}

impl AppState {
    pub fn new(dispatch: DispatchHandle, outbox: Arc<Outbox>, api_key: Option<&str>) -> Self {
        Self {
            dispatch,
            outbox,
            api_key_hash: api_key.map(helpers::hash_api_key),
        }
    }
}

/// Create the application router around a running dispatcher
pub fn create_app(state: AppState, request_body_limit: usize, request_timeout: Duration) -> Router {
    let state = Arc::new(state);

    // Player lifecycle, reported by the game server
    let player_routes = Router::new()
        .route("/players/connect", post(routes::connect))
        .route("/players/sync", post(routes::sync));

    // Rename and penalty events
    let event_routes = Router::new()
        .route("/events/rename", post(routes::rename))
        .route("/events/kick", post(routes::kick))
        .route("/events/tempban", post(routes::tempban))
        .route("/events/ban", post(routes::ban))
        .route("/events/disconnect", post(routes::disconnect));

    let admin_routes = Router::new()
        .route("/commands", get(routes::commands))
        .route("/reload", post(routes::reload))
        .route("/status", get(routes::status));

    let protected = player_routes
        .merge(event_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::require_api_key,
        ));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(protected)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
