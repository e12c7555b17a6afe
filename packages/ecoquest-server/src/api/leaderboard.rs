//! Leaderboard endpoint.

use axum::extract::{Query, State};
use ecoquest_core::{LeaderboardMode, LeaderboardView};
use serde::Deserialize;

use super::{ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// GET /api/leaderboard query
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// `global` (default), `weekly`, `monthly` or `all_time`
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default, alias = "communityId")]
    pub community_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// GET /api/leaderboard
///
/// Ranked entries plus the caller's rank.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<LeaderboardView> {
    let mode = match query.period.as_deref() {
        Some(period) => period.parse::<LeaderboardMode>()?,
        None => LeaderboardMode::default(),
    };
    let view = state
        .run(move |service| {
            service.get_leaderboard(
                Some(caller.id()),
                mode,
                query.community_id.as_deref(),
                query.limit,
            )
        })
        .await?;
    Ok(ApiResponse::success(view))
}
