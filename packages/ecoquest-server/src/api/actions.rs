//! Eco-action endpoints: submission, the caller's history and the admin
//! review queue.

use axum::extract::{Path, State};
use ecoquest_core::storage::ActionRecord;
use ecoquest_core::{ActionSubmission, ReviewDecision};
use serde::Deserialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// POST /api/actions/:id/review
#[derive(Debug, Deserialize)]
pub struct ReviewActionRequest {
    pub decision: ReviewDecision,
    /// Defaults to the configured action reward
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /api/actions
///
/// Submit an eco-action.
///
/// `aiConfidence` is the score already computed by the image model.
pub async fn submit_action(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(submission): ApiJson<ActionSubmission>,
) -> ApiResult<ActionRecord> {
    let action = state
        .run(move |service| service.submit_action(caller.id(), submission))
        .await?;
    Ok(ApiResponse::success(action))
}

/// GET /api/actions/mine
pub async fn my_actions(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<ActionRecord>> {
    let actions = state
        .run(move |service| service.list_actions_for_user(caller.id()))
        .await?;
    Ok(ApiResponse::success(actions))
}

/// GET /api/actions/pending
///
/// Manual review queue (admin only).
pub async fn pending_actions(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<ActionRecord>> {
    let actions = state
        .run(move |service| service.list_pending_actions(caller.id()))
        .await?;
    Ok(ApiResponse::success(actions))
}

/// POST /api/actions/:id/review
///
/// Approve or reject (admin only).
pub async fn review_action(
    State(state): State<AppState>,
    caller: Caller,
    Path(action_id): Path<String>,
    ApiJson(req): ApiJson<ReviewActionRequest>,
) -> ApiResult<ActionRecord> {
    let action = state
        .run(move |service| {
            service.review_action(
                caller.id(),
                &action_id,
                req.decision,
                req.points,
                req.note.as_deref(),
            )
        })
        .await?;
    Ok(ApiResponse::success(action))
}
