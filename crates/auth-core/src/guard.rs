//! Guard
//!
//! 身份解析 + 角色授权的组合点。拒绝时受保护操作不会开始执行。

use std::future::Future;

use metrics::counter;
use portal_errors::{AppError, AppResult};
use thiserror::Error;
use tracing::{info, warn};

use crate::{AuthRequest, CurrentUser, Identity, IdentityResolver, Role, authorize_named, decide};

/// 对外可见的认证失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient role")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// 用户存储不可用，与“拒绝”区分，由调用方决定是否重试
    #[error("Identity store unavailable: {0}")]
    Unavailable(AppError),
}

impl GuardError {
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            GuardError::Rejected(rejection) => Some(*rejection),
            GuardError::Unavailable(_) => None,
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Rejected(Rejection::Unauthenticated) => {
                AppError::unauthenticated("Authentication required")
            }
            GuardError::Rejected(Rejection::Forbidden) => AppError::forbidden("Insufficient role"),
            GuardError::Unavailable(e) => e,
        }
    }
}

fn record_outcome(outcome: &'static str) {
    counter!("auth_guard_decisions_total", "outcome" => outcome).increment(1);
}

#[derive(Clone)]
pub struct Guard {
    resolver: IdentityResolver,
}

impl Guard {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// 解析身份并检查角色，通过时返回当前用户
    pub async fn admit(
        &self,
        request: &AuthRequest<'_>,
        required: Role,
    ) -> Result<CurrentUser, GuardError> {
        let identity = match self.resolver.resolve(request).await {
            Ok(identity) => identity,
            Err(e) => {
                record_outcome("unavailable");
                return Err(GuardError::Unavailable(e));
            }
        };

        let Identity::Authenticated(user) = identity else {
            record_outcome("unauthenticated");
            info!(%required, "Rejected anonymous request");
            return Err(Rejection::Unauthenticated.into());
        };

        if !decide(&user, required).allowed {
            record_outcome("forbidden");
            warn!(user_id = %user.id, role = %user.role, %required, "Rejected request with insufficient role");
            return Err(Rejection::Forbidden.into());
        }

        record_outcome("allowed");
        Ok(user)
    }

    /// 在角色检查通过后执行 `operation`，其返回值原样透传
    pub async fn guard<F, Fut, T>(
        &self,
        request: &AuthRequest<'_>,
        required: Role,
        operation: F,
    ) -> Result<T, GuardError>
    where
        F: FnOnce(CurrentUser) -> Fut,
        Fut: Future<Output = T>,
    {
        let user = self.admit(request, required).await?;
        Ok(operation(user).await)
    }

    /// 当前请求是否达到角色名 `required`；匿名或未知角色名为 `false`
    pub async fn validate_user_role(
        &self,
        request: &AuthRequest<'_>,
        required: &str,
    ) -> AppResult<bool> {
        let identity = self.resolver.resolve(request).await?;
        Ok(identity
            .user()
            .is_some_and(|user| authorize_named(user, required)))
    }
}
