//! 身份解析
//!
//! cookie -> 令牌 -> 未过期 -> 未软删除的用户记录 -> `CurrentUser`。
//! 任何一步失败都收敛为 `Identity::Anonymous`；只有存储不可用会作为错误返回。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use portal_common::UserId;
use portal_errors::{AppError, AppResult};
use portal_ports::{FindOptions, UserRecord, UserStore};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{Role, SessionCarrier, SessionCodec};

/// 存储查询默认超时
pub const DEFAULT_LOOKUP_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// 当前请求的已认证用户（不含凭证哈希）
///
/// 只在请求范围内存在，不跨请求缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CurrentUser {
    /// 从存储记录投影
    ///
    /// 软删除记录或角色无法识别时返回 `None`
    pub fn from_record(record: UserRecord) -> Option<Self> {
        if record.is_soft_deleted() {
            return None;
        }

        let Some(role) = Role::parse(&record.role) else {
            warn!(user_id = %record.id, role = %record.role, "Unrecognized stored role");
            return None;
        };

        Some(Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role,
            department: record.department,
            job_title: record.job_title,
            phone: record.phone,
            address: record.address,
            created_at: record.created_at,
        })
    }
}

/// 身份解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(CurrentUser),
    Anonymous,
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn into_user(self) -> Option<CurrentUser> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }
}

/// 单个请求的认证上下文
///
/// 显式携带请求头与该请求的逻辑时间，同一请求内多次解析结果一致
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    headers: &'a HeaderMap,
    now: DateTime<Utc>,
}

impl<'a> AuthRequest<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self::at(headers, Utc::now())
    }

    pub fn at(headers: &'a HeaderMap, now: DateTime<Utc>) -> Self {
        Self { headers, now }
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// 身份解析器
#[derive(Clone)]
pub struct IdentityResolver {
    codec: SessionCodec,
    carrier: SessionCarrier,
    store: Arc<dyn UserStore>,
    lookup_timeout: StdDuration,
}

impl IdentityResolver {
    pub fn new(codec: SessionCodec, carrier: SessionCarrier, store: Arc<dyn UserStore>) -> Self {
        Self {
            codec,
            carrier,
            store,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: StdDuration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    pub fn carrier(&self) -> &SessionCarrier {
        &self.carrier
    }

    /// 解析请求身份
    ///
    /// 只读，无副作用；存储查询只做一次，不重试
    pub async fn resolve(&self, request: &AuthRequest<'_>) -> AppResult<Identity> {
        let Some(raw) = self.carrier.read(request.headers()) else {
            return Ok(Identity::Anonymous);
        };

        let token = match self.codec.decode(&raw) {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "Session token rejected");
                return Ok(Identity::Anonymous);
            }
        };

        if token.is_expired_at(request.now()) {
            debug!(user_id = %token.subject(), expires_at = %token.expires_at(), "Session expired");
            return Ok(Identity::Anonymous);
        }

        let record = self.lookup(token.subject()).await?;

        match record.and_then(CurrentUser::from_record) {
            Some(user) => Ok(Identity::Authenticated(user)),
            None => {
                debug!(user_id = %token.subject(), "Session subject not found or inactive");
                Ok(Identity::Anonymous)
            }
        }
    }

    async fn lookup(&self, id: &UserId) -> AppResult<Option<UserRecord>> {
        let lookup = self.store.find_by_id(id, FindOptions::active());

        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => {
                error!(user_id = %id, error = %e, "User store lookup failed");
                Err(e)
            }
            Err(_) => {
                error!(user_id = %id, timeout_ms = self.lookup_timeout.as_millis() as u64, "User store lookup timed out");
                Err(AppError::external_service("User store lookup timed out"))
            }
        }
    }
}
