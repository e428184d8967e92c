//! 测试辅助

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{body::Body, response::Response};
use chrono::{Duration, Utc};
use portal_auth_core::{CredentialHasher, Guard, IdentityResolver, SessionCarrier, SessionCodec};
use portal_common::UserId;
use portal_errors::{AppError, AppResult};
use portal_ports::{FindOptions, UserRecord, UserStore};

use crate::state::AppState;

pub const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
pub const PASSWORD: &str = "correct horse battery staple";

fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| CredentialHasher::hash(PASSWORD).unwrap())
        .clone()
}

pub fn record(role: &str, email: &str) -> UserRecord {
    UserRecord {
        id: UserId::new(),
        name: Some("Test User".to_string()),
        email: email.to_string(),
        password_hash: password_hash(),
        role: role.to_string(),
        department: Some("Operations".to_string()),
        job_title: None,
        phone: None,
        address: None,
        created_at: Utc::now(),
        deleted_at: None,
    }
}

pub fn state_with(store: Arc<dyn UserStore>) -> AppState {
    let resolver = IdentityResolver::new(
        SessionCodec::new(SECRET),
        SessionCarrier::new("session").with_secure(false),
        store.clone(),
    );
    AppState::new(Guard::new(resolver), store, Duration::hours(1))
}

pub fn cookie_for(state: &AppState, id: &UserId) -> String {
    let token = state.codec().issue(id, state.session_ttl).unwrap();
    format!("session={}", token.serialize())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 始终不可用的存储
pub struct UnavailableStore;

#[async_trait]
impl UserStore for UnavailableStore {
    async fn find_by_id(&self, _: &UserId, _: FindOptions) -> AppResult<Option<UserRecord>> {
        Err(AppError::database("connection refused"))
    }

    async fn find_by_email(&self, _: &str, _: FindOptions) -> AppResult<Option<UserRecord>> {
        Err(AppError::database("connection refused"))
    }

    async fn list_active(&self) -> AppResult<Vec<UserRecord>> {
        Err(AppError::database("connection refused"))
    }
}
