//! Challenge catalog and progress endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use ecoquest_core::storage::{ChallengeProgressRecord, ChallengeRecord};
use ecoquest_core::{AdvanceOutcome, Error};
use serde::Deserialize;

use super::{ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// GET /api/challenges query
#[derive(Debug, Default, Deserialize)]
pub struct ListChallengesQuery {
    /// Include inactive challenges
    #[serde(default)]
    pub all: bool,
}

/// POST /api/challenges/:id/advance
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default = "default_increment")]
    pub increment: i64,
}

fn default_increment() -> i64 {
    1
}

/// GET /api/challenges
///
/// The challenge catalog.
pub async fn list_challenges(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<ListChallengesQuery>,
) -> ApiResult<Vec<ChallengeRecord>> {
    let challenges = state
        .run(move |service| service.list_challenges(!query.all))
        .await?;
    Ok(ApiResponse::success(challenges))
}

/// GET /api/challenges/progress
///
/// The caller's progress records.
pub async fn list_progress(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<ChallengeProgressRecord>> {
    let progress = state
        .run(move |service| service.list_progress(caller.id()))
        .await?;
    Ok(ApiResponse::success(progress))
}

/// POST /api/challenges/:id/start
pub async fn start_challenge(
    State(state): State<AppState>,
    caller: Caller,
    Path(challenge_id): Path<String>,
) -> ApiResult<ChallengeProgressRecord> {
    let progress = state
        .run(move |service| service.start_challenge(caller.id(), &challenge_id))
        .await?;
    Ok(ApiResponse::success(progress))
}

/// POST /api/challenges/:id/advance
///
/// Points are paid on the completing call only. An empty body advances
/// by one.
pub async fn advance_challenge(
    State(state): State<AppState>,
    caller: Caller,
    Path(challenge_id): Path<String>,
    body: Bytes,
) -> ApiResult<AdvanceOutcome> {
    let increment = if body.is_empty() {
        default_increment()
    } else {
        serde_json::from_slice::<AdvanceRequest>(&body)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?
            .increment
    };
    let outcome = state
        .run(move |service| service.advance_challenge(caller.id(), &challenge_id, increment))
        .await?;
    Ok(ApiResponse::success(outcome))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::*;

    #[tokio::test]
    async fn test_start_and_complete_challenge() {
        let (app, state) = app(&[]);
        sync(&app, "u1").await;

        let (status, body) = send(&app, Method::GET, "/api/challenges", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 5);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/challenges/eco-quiz-champion/start",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "IN_PROGRESS");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/challenges/eco-quiz-champion/advance",
            Some("u1"),
            Some(json!({ "increment": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completedNow"], true);
        assert_eq!(body["data"]["progress"]["progress"], 3);
        assert_eq!(body["data"]["pointsAwarded"], 40);
        assert_eq!(state.service.get_profile("u1").unwrap().total_points, 40);
    }

    #[tokio::test]
    async fn test_advance_errors() {
        let (app, _) = app(&[]);
        sync(&app, "u1").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/challenges/energy-saver/advance",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/api/challenges/nope/start", Some("u1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_increment_is_rejected() {
        let (app, state) = app(&[]);
        sync(&app, "u1").await;
        send(&app, Method::POST, "/api/challenges/eco-quiz-champion/start", Some("u1"), None).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/challenges/eco-quiz-champion/advance",
            Some("u1"),
            Some(json!({ "increment": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], 300);

        let progress = state.service.list_progress("u1").unwrap();
        assert_eq!(progress[0].progress, 0);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/challenges/eco-quiz-champion/advance",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["progress"]["progress"], 1);
    }
}
