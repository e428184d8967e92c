//! 员工目录

use axum::{Json, extract::State};
use portal_auth_core::CurrentUser;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 未软删除的全部用户，按创建时间倒序
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
) -> ApiResult<Json<Vec<CurrentUser>>> {
    let records = state.store.list_active().await?;
    let users: Vec<CurrentUser> = records
        .into_iter()
        .filter_map(CurrentUser::from_record)
        .collect();

    tracing::debug!(viewer = %viewer.id, count = users.len(), "Listed users");
    Ok(Json(users))
}
