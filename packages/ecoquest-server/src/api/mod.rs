//! REST API.
//!
//! Every endpoint answers with the same envelope:
//!
//! ```text
//! { "ok": true,  "data": ... }
//! { "ok": false, "error": "...", "code": 401, "data": { ... } }
//! ```
//!
//! `code` is the core error code; `data` on a failure carries details such
//! as the current and required points for an eligibility error.

mod actions;
mod badges;
mod challenges;
mod communities;
mod games;
mod leaderboard;
mod profiles;
mod tasks;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ecoquest_core::{Error, ErrorKind};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// ── Response Types ───────────────────────────────────────────────────────────

/// Response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            ok: true,
            data: Some(data),
            error: None,
            code: None,
        })
    }
}

/// Handler result.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// An error rendered as the failure envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientEligibility => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = status_for(err.kind());
        let details = match &err {
            Error::InsufficientPoints { current, required } => Some(json!({
                "current": current,
                "required": required,
            })),
            _ => None,
        };
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
        }
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse {
                ok: false,
                data: self.details,
                error: Some(self.message),
                code: Some(self.code),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from(Error::InvalidArgument(rejection.body_text()))
    }
}

// ── Request Types ────────────────────────────────────────────────────────────

/// JSON body extractor.
///
/// Same as [`Json`], except that a missing content type, unparseable JSON
/// or a body that does not match `T` is answered with the failure envelope
/// and `400 Bad Request`.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Profiles
        .route("/api/profiles/sync", post(profiles::sync_profile))
        .route("/api/profiles/:id", axum::routing::delete(profiles::delete_profile))
        .route("/api/me", get(profiles::me))
        // Challenges
        .route("/api/challenges", get(challenges::list_challenges))
        .route("/api/challenges/progress", get(challenges::list_progress))
        .route("/api/challenges/:id/start", post(challenges::start_challenge))
        .route("/api/challenges/:id/advance", post(challenges::advance_challenge))
        // Mini-games
        .route("/api/games/sessions", post(games::start_session))
        .route("/api/games/sessions/:id/complete", post(games::complete_session))
        .route("/api/games/sessions/:id/abandon", post(games::abandon_session))
        // Eco-actions
        .route("/api/actions", post(actions::submit_action))
        .route("/api/actions/mine", get(actions::my_actions))
        .route("/api/actions/pending", get(actions::pending_actions))
        .route("/api/actions/:id/review", post(actions::review_action))
        // Communities
        .route(
            "/api/communities/requests",
            post(communities::request_community).get(communities::pending_requests),
        )
        .route("/api/communities/requests/mine", get(communities::my_requests))
        .route(
            "/api/communities/requests/:id/review",
            post(communities::review_request),
        )
        .route("/api/communities", get(communities::list_communities))
        .route("/api/communities/join", post(communities::join_community))
        .route("/api/communities/:id", get(communities::get_community))
        .route("/api/communities/:id/members", get(communities::list_members))
        .route("/api/communities/:id/leave", post(communities::leave_community))
        // Leaderboard
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        // Badges
        .route("/api/badges", get(badges::list_badges))
        .route("/api/badges/check", post(badges::check_badges))
        .route("/api/badges/grant", post(badges::grant_badge))
        // Daily tasks
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/:id/complete", post(tasks::complete_task))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "ecoquest-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Tests ────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(&[]);
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "ecoquest-server");
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (app, _) = app(&[]);
        let (status, body) = send(&app, Method::GET, "/api/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], 100);
    }

    #[test]
    fn test_error_mapping() {
        let err = ApiError::from(Error::InsufficientPoints {
            current: 120,
            required: 500,
        });
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.details.unwrap()["required"], 500);

        assert_eq!(ApiError::from(Error::AdminRequired).status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(Error::NotMember).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(Error::ChallengeNotStarted).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(Error::AlreadyMember).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(Error::DatabaseError("x".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
