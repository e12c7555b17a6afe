//! Mini-game session endpoints.

use axum::extract::{Path, State};
use ecoquest_core::storage::GameSessionRecord;
use ecoquest_core::GameType;
use serde::Deserialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// POST /api/games/sessions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub game_type: GameType,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

/// POST /api/games/sessions/:id/complete
#[derive(Debug, Deserialize)]
pub struct CompleteSessionRequest {
    pub score: i64,
}

/// POST /api/games/sessions
///
/// Begin a play.
pub async fn start_session(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<StartSessionRequest>,
) -> ApiResult<GameSessionRecord> {
    let session = state
        .run(move |service| {
            service.start_session(caller.id(), req.game_type, req.challenge_id.as_deref())
        })
        .await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/games/sessions/:id/complete
///
/// Finish with a score.
pub async fn complete_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<String>,
    ApiJson(req): ApiJson<CompleteSessionRequest>,
) -> ApiResult<GameSessionRecord> {
    let session = state
        .run(move |service| service.complete_session(caller.id(), &session_id, req.score))
        .await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/games/sessions/:id/abandon
pub async fn abandon_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<String>,
) -> ApiResult<GameSessionRecord> {
    let session = state
        .run(move |service| service.abandon_session(caller.id(), &session_id))
        .await?;
    Ok(ApiResponse::success(session))
}
