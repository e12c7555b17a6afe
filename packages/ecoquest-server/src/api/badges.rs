//! Badge endpoints.

use axum::extract::State;
use ecoquest_core::{BadgeRecord, BadgeStatus};
use serde::Deserialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// POST /api/badges/grant
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantBadgeRequest {
    pub user_id: String,
    pub badge_id: String,
}

/// GET /api/badges
///
/// Catalog with the caller's earned flags.
pub async fn list_badges(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<BadgeStatus>> {
    let badges = state
        .run(move |service| service.list_badges(caller.id()))
        .await?;
    Ok(ApiResponse::success(badges))
}

/// POST /api/badges/check
///
/// Evaluate now; returns only new grants.
pub async fn check_badges(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<BadgeRecord>> {
    let granted = state
        .run(move |service| service.check_and_award(caller.id()))
        .await?;
    Ok(ApiResponse::success(granted))
}

/// POST /api/badges/grant
///
/// Manual grant (admin only).
///
/// `data` is false when the user already held the badge.
pub async fn grant_badge(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<GrantBadgeRequest>,
) -> ApiResult<bool> {
    let granted = state
        .run(move |service| service.grant_badge(caller.id(), &req.user_id, &req.badge_id))
        .await?;
    Ok(ApiResponse::success(granted))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::*;

    #[tokio::test]
    async fn test_check_is_idempotent() {
        let (app, _) = app(&[]);
        sync(&app, "u1").await;
        send(&app, Method::POST, "/api/tasks/turn-off-lights/complete", Some("u1"), None).await;

        // The task completion already evaluated badges.
        let (status, body) = send(&app, Method::POST, "/api/badges/check", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let (_, body) = send(&app, Method::GET, "/api/badges", Some("u1"), None).await;
        let badges = body["data"].as_array().unwrap();
        assert_eq!(badges.len(), 14);
        assert!(badges.iter().all(|b| b["earned"] == false));
    }

    #[tokio::test]
    async fn test_grant_requires_admin() {
        let (app, _) = app(&["boss"]);
        sync(&app, "u1").await;
        sync(&app, "boss").await;
        let grant = json!({ "userId": "u1", "badgeId": "badge-streak-7" });

        let (status, _) = send(&app, Method::POST, "/api/badges/grant", Some("u1"), Some(grant.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::POST, "/api/badges/grant", Some("boss"), Some(grant)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], true);
    }
}
