//! 内存用户存储
//!
//! 用于本地开发和测试，不持久化

use std::collections::HashMap;

use async_trait::async_trait;
use portal_common::UserId;
use portal_errors::AppResult;
use tokio::sync::RwLock;

use crate::{FindOptions, UserRecord, UserStore};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }

    /// 标记为软删除
    pub async fn soft_delete(&self, id: &UserId) -> bool {
        match self.users.write().await.get_mut(id) {
            Some(user) => {
                user.deleted_at = Some(chrono::Utc::now());
                true
            }
            None => false,
        }
    }
}

fn visible(user: &UserRecord, options: FindOptions) -> bool {
    !(options.exclude_soft_deleted && user.is_soft_deleted())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &UserId, options: FindOptions) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .get(id)
            .filter(|u| visible(u, options))
            .cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        options: FindOptions,
    ) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email && visible(u, options))
            .cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| !u.is_soft_deleted())
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
