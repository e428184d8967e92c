//! 认证路由

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use metrics::counter;
use portal_auth_core::{CredentialHasher, CurrentUser};
use portal_errors::{AppError, AppResult};
use portal_ports::FindOptions;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 无需会话即可访问的认证路由
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn record_login(outcome: &'static str) {
    counter!("auth_logins_total", "outcome" => outcome).increment(1);
}

/// 校验凭证，邮箱不存在与密码错误在结果和耗时上都不做区分
async fn authenticate(state: &AppState, req: &LoginRequest) -> AppResult<Option<CurrentUser>> {
    let record = state
        .store
        .find_by_email(req.email.trim(), FindOptions::active())
        .await?;

    // 账号不存在时也完整执行一次哈希校验
    let phc = record.as_ref().map(|r| r.password_hash.as_str());
    if !CredentialHasher::verify_optional(&req.password, phc)? {
        return Ok(None);
    }

    Ok(record.and_then(CurrentUser::from_record))
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<Response> {
    let Some(user) = authenticate(&state, &req).await? else {
        record_login("failure");
        warn!("Login failed");
        return Err(AppError::unauthorized("Invalid email or password").into());
    };

    let token = state.codec().issue(&user.id, state.session_ttl)?;
    let mut headers = HeaderMap::new();
    state
        .carrier()
        .write(&mut headers, &token.serialize(), state.session_ttl)?;

    record_login("success");
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((headers, Json(user)).into_response())
}

/// 清除会话 cookie；令牌本身无状态，不做服务端吊销
async fn logout(State(state): State<AppState>) -> ApiResult<(StatusCode, HeaderMap)> {
    let mut headers = HeaderMap::new();
    state.carrier().clear(&mut headers)?;
    Ok((StatusCode::NO_CONTENT, headers))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<CurrentUser> {
    Json(user)
}
