//! Profile endpoints: identity sync, deletion and the caller's summary.

use axum::extract::{Path, State};
use ecoquest_core::storage::ProfileRecord;
use ecoquest_core::ProfileSummary;
use serde::Deserialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// POST /api/profiles/sync
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// POST /api/profiles/sync
///
/// Create or refresh the caller's profile.
///
/// Called on sign-up and whenever the identity provider reports a change.
/// Configured admin ids are promoted here.
pub async fn sync_profile(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<SyncProfileRequest>,
) -> ApiResult<ProfileRecord> {
    let promote = state.is_configured_admin(caller.id());
    let profile = state
        .run(move |service| {
            let profile =
                service.sync_profile(caller.id(), &req.display_name, req.avatar_url.as_deref())?;
            if promote && !profile.is_admin {
                return service.set_admin(caller.id(), true);
            }
            Ok(profile)
        })
        .await?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/profiles/:id
///
/// Remove a profile and everything it owns.
///
/// Allowed for the profile's owner and for administrators.
pub async fn delete_profile(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> ApiResult<String> {
    let deleted = state
        .run(move |service| {
            if caller.id() != user_id {
                service.ensure_admin(caller.id())?;
            }
            service.delete_profile(&user_id)?;
            Ok(user_id)
        })
        .await?;
    Ok(ApiResponse::success(deleted))
}

/// GET /api/me
///
/// The caller's profile, stats and memberships.
pub async fn me(State(state): State<AppState>, caller: Caller) -> ApiResult<ProfileSummary> {
    let summary = state
        .run(move |service| service.profile_summary(caller.id()))
        .await?;
    Ok(ApiResponse::success(summary))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::*;

    #[tokio::test]
    async fn test_sync_and_me() {
        let (app, _) = app(&[]);
        sync(&app, "u1").await;

        let (status, body) = send(&app, Method::GET, "/api/me", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profile"]["displayName"], "User u1");
        assert_eq!(body["data"]["profile"]["totalPoints"], 0);
        assert_eq!(body["data"]["stats"]["actionsSubmitted"], 0);

        let (status, _) = send(&app, Method::GET, "/api/me", Some("ghost"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_configured_admin_promoted_on_sync() {
        let (app, state) = app(&["boss"]);
        sync(&app, "boss").await;
        assert!(state.service.get_profile("boss").unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_sync_validates_name() {
        let (app, _) = app(&[]);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/profiles/sync",
            Some("u1"),
            Some(json!({ "displayName": " " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_delete_own_or_admin_only() {
        let (app, state) = app(&["boss"]);
        sync(&app, "u1").await;
        sync(&app, "u2").await;
        sync(&app, "boss").await;

        let (status, _) = send(&app, Method::DELETE, "/api/profiles/u1", Some("u2"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, "/api/profiles/u1", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, "/api/profiles/u2", Some("boss"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.service.get_profile("u2").is_err());
    }
}
