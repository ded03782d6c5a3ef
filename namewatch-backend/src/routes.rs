use crate::AppState;
use crate::dispatcher::Request;
use crate::error::AppError;
use crate::outbox::Command;
use crate::roster::ConnectedPlayer;
use crate::validation::{self, ValidationError};

use axum::{
    Json,
    extract::{Request as HttpRequest, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use headers::Authorization;
use headers::authorization::Bearer;
use namewatch_core::{Event, Guid, RenameEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct PlayerPayload {
    guid: String,
    slot: u32,
    #[serde(default)]
    ip: String,
    name: String,
    #[serde(default)]
    level: u32,
}

impl PlayerPayload {
    fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_player(&self.guid, &self.name, &self.ip)
    }

    fn into_player(self) -> ConnectedPlayer {
        ConnectedPlayer {
            guid: Guid::from(self.guid),
            slot: self.slot,
            ip: self.ip,
            name: self.name,
            level: self.level,
        }
    }

    fn into_rename(self) -> RenameEvent {
        RenameEvent {
            guid: Guid::from(self.guid),
            slot: self.slot,
            ip: self.ip,
            name: self.name,
            level: self.level,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct GuidPayload {
    guid: String,
}

impl GuidPayload {
    fn into_guid(self) -> Result<Guid, AppError> {
        validation::validate_guid(&self.guid)?;
        Ok(Guid::from(self.guid))
    }
}

#[derive(Deserialize)]
pub(crate) struct SyncPayload {
    players: Vec<PlayerPayload>,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    online: usize,
    tracked: usize,
}

/// Reject requests without the configured bearer key. Open when no key is set.
pub(crate) async fn require_api_key(
    State(state): State<Arc<AppState>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: HttpRequest,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &state.api_key_hash {
        let presented = auth.map(|TypedHeader(auth)| crate::helpers::hash_api_key(auth.token()));
        if presented.as_ref() != Some(expected) {
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

async fn forward(state: &AppState, request: Request) -> Result<StatusCode, AppError> {
    state.dispatch.send(request).await?;
    Ok(StatusCode::OK)
}

#[debug_handler]
pub(crate) async fn connect(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlayerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    forward(&state, Request::Connect(payload.into_player())).await
}

pub(crate) async fn sync(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SyncPayload>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_player_count(payload.players.len())?;
    for player in &payload.players {
        player.validate()?;
    }

    let players = payload
        .players
        .into_iter()
        .map(PlayerPayload::into_player)
        .collect();
    forward(&state, Request::Sync(players)).await
}

#[debug_handler]
pub(crate) async fn rename(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlayerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    forward(&state, Request::Event(Event::Rename(payload.into_rename()))).await
}

pub(crate) async fn kick(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuidPayload>,
) -> Result<impl IntoResponse, AppError> {
    let guid = payload.into_guid()?;
    forward(&state, Request::Event(Event::Kick(guid))).await
}

pub(crate) async fn tempban(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuidPayload>,
) -> Result<impl IntoResponse, AppError> {
    let guid = payload.into_guid()?;
    forward(&state, Request::Event(Event::TempBan(guid))).await
}

pub(crate) async fn ban(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuidPayload>,
) -> Result<impl IntoResponse, AppError> {
    let guid = payload.into_guid()?;
    forward(&state, Request::Event(Event::Ban(guid))).await
}

pub(crate) async fn disconnect(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GuidPayload>,
) -> Result<impl IntoResponse, AppError> {
    let guid = payload.into_guid()?;
    forward(&state, Request::Event(Event::Disconnect(guid))).await
}

/// Hand every queued command to the game server.
pub(crate) async fn commands(State(state): State<Arc<AppState>>) -> Json<Vec<Command>> {
    Json(state.outbox.drain())
}

pub(crate) async fn reload(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    forward(&state, Request::Reload).await
}

#[debug_handler]
pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.dispatch.status().await?;
    Ok(Json(StatusResponse {
        online: status.online,
        tracked: status.tracked,
    }))
}
