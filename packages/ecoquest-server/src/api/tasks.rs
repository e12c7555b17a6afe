//! Daily task endpoints.

use axum::extract::{Path, State};
use ecoquest_core::{TaskCompletion, TaskStatus};

use super::{ApiResponse, ApiResult};
use crate::auth::Caller;
use crate::state::AppState;

/// GET /api/tasks
///
/// Tasks with today's completion flags.
pub async fn list_tasks(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<TaskStatus>> {
    let tasks = state
        .run(move |service| service.list_tasks(caller.id()))
        .await?;
    Ok(ApiResponse::success(tasks))
}

/// POST /api/tasks/:id/complete
///
/// Once per task per UTC day.
pub async fn complete_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(task_id): Path<String>,
) -> ApiResult<TaskCompletion> {
    let completion = state
        .run(move |service| service.complete_task(caller.id(), &task_id))
        .await?;
    Ok(ApiResponse::success(completion))
}
