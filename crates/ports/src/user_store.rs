//! 用户记录存储 trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_common::UserId;
use portal_errors::AppResult;

/// 持久化的用户记录
///
/// `role` 保留存储中的原始字符串，由认证层负责解析。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// 是否已软删除
    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 查询选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub exclude_soft_deleted: bool,
}

impl FindOptions {
    /// 只查询未软删除的记录
    pub fn active() -> Self {
        Self {
            exclude_soft_deleted: true,
        }
    }

    /// 包含软删除的记录
    pub fn including_deleted() -> Self {
        Self {
            exclude_soft_deleted: false,
        }
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        Self::active()
    }
}

/// 用户记录存储
///
/// 实现方负责自身的重试策略；连接失败等基础设施错误应返回
/// `AppError::Database` / `AppError::ExternalService`，不能返回 `Ok(None)`。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: &UserId, options: FindOptions) -> AppResult<Option<UserRecord>>;

    /// 根据邮箱查找用户（登录）
    async fn find_by_email(&self, email: &str, options: FindOptions)
    -> AppResult<Option<UserRecord>>;

    /// 列出所有未软删除的用户，按创建时间倒序
    async fn list_active(&self) -> AppResult<Vec<UserRecord>>;
}
