//! Community endpoints: creation requests and their review, membership,
//! and listings.

use axum::extract::{Path, State};
use ecoquest_core::storage::{CommunityMemberRecord, CommunityRecord, CommunityRequestRecord};
use ecoquest_core::{RequestReview, ReviewDecision};
use serde::Deserialize;

use super::{ApiJson, ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// POST /api/communities/requests
#[derive(Debug, Deserialize)]
pub struct CommunityRequestBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/communities/requests/:id/review
#[derive(Debug, Deserialize)]
pub struct ReviewRequestBody {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /api/communities/join
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCommunityBody {
    pub join_code: String,
}

/// POST /api/communities/requests
///
/// Ask for a new community.
///
/// Below the point threshold this answers 403 with the current and
/// required points in `data`.
pub async fn request_community(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CommunityRequestBody>,
) -> ApiResult<CommunityRequestRecord> {
    let request = state
        .run(move |service| {
            service.request_community(caller.id(), &req.name, req.description.as_deref())
        })
        .await?;
    Ok(ApiResponse::success(request))
}

/// GET /api/communities/requests
///
/// Pending requests (admin only).
pub async fn pending_requests(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<CommunityRequestRecord>> {
    let requests = state
        .run(move |service| service.list_pending_requests(caller.id()))
        .await?;
    Ok(ApiResponse::success(requests))
}

/// GET /api/communities/requests/mine
pub async fn my_requests(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<CommunityRequestRecord>> {
    let requests = state
        .run(move |service| service.my_requests(caller.id()))
        .await?;
    Ok(ApiResponse::success(requests))
}

/// POST /api/communities/requests/:id/review
///
/// Approve or reject (admin only).
pub async fn review_request(
    State(state): State<AppState>,
    caller: Caller,
    Path(request_id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequestBody>,
) -> ApiResult<RequestReview> {
    let review = state
        .run(move |service| {
            service.review_community_request(
                caller.id(),
                &request_id,
                req.decision,
                req.note.as_deref(),
            )
        })
        .await?;
    Ok(ApiResponse::success(review))
}

/// GET /api/communities
pub async fn list_communities(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Vec<CommunityRecord>> {
    let communities = state.run(|service| service.list_communities()).await?;
    Ok(ApiResponse::success(communities))
}

/// GET /api/communities/:id
pub async fn get_community(
    State(state): State<AppState>,
    _caller: Caller,
    Path(community_id): Path<String>,
) -> ApiResult<CommunityRecord> {
    let community = state
        .run(move |service| service.get_community(&community_id))
        .await?;
    Ok(ApiResponse::success(community))
}

/// GET /api/communities/:id/members
///
/// Active members.
pub async fn list_members(
    State(state): State<AppState>,
    _caller: Caller,
    Path(community_id): Path<String>,
) -> ApiResult<Vec<CommunityMemberRecord>> {
    let members = state
        .run(move |service| service.list_members(&community_id))
        .await?;
    Ok(ApiResponse::success(members))
}

/// POST /api/communities/join
///
/// Join by code.
pub async fn join_community(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<JoinCommunityBody>,
) -> ApiResult<CommunityMemberRecord> {
    let member = state
        .run(move |service| service.join_community(caller.id(), &req.join_code))
        .await?;
    Ok(ApiResponse::success(member))
}

/// POST /api/communities/:id/leave
pub async fn leave_community(
    State(state): State<AppState>,
    caller: Caller,
    Path(community_id): Path<String>,
) -> ApiResult<CommunityMemberRecord> {
    let member = state
        .run(move |service| service.leave_community(caller.id(), &community_id))
        .await?;
    Ok(ApiResponse::success(member))
}
