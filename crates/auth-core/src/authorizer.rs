//! 角色层级授权
//!
//! `rank(user.role) >= rank(required)`，单调；不是按权限点授予的 ACL

use tracing::warn;

use crate::{CurrentUser, Role};

/// 授权结果，无状态，不持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
}

/// 计算授权结果
pub fn decide(user: &CurrentUser, required: Role) -> AuthorizationDecision {
    AuthorizationDecision {
        allowed: user.role.satisfies(required),
    }
}

/// 用户角色是否达到 `required`
pub fn authorize(user: &CurrentUser, required: Role) -> bool {
    decide(user, required).allowed
}

/// 按角色名授权，未知角色名一律拒绝
pub fn authorize_named(user: &CurrentUser, required: &str) -> bool {
    match Role::parse(required) {
        Some(role) => authorize(user, role),
        None => {
            warn!(required, "Unknown required role, denying");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portal_common::UserId;

    fn user_with(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(),
            name: Some("Test Employee".to_string()),
            email: "employee@example.com".to_string(),
            role,
            department: None,
            job_title: None,
            phone: None,
            address: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_authorize_matches_rank_order_for_all_pairs() {
        for held in Role::ALL {
            for required in Role::ALL {
                assert_eq!(
                    authorize(&user_with(held), required),
                    held.rank() >= required.rank(),
                    "{} vs {}",
                    held,
                    required
                );
            }
        }
    }

    #[test]
    fn test_employee_cannot_reach_hr() {
        assert!(!authorize(&user_with(Role::Employee), Role::Hr));
        assert!(authorize(&user_with(Role::Hr), Role::Hr));
        assert!(authorize(&user_with(Role::SuperManager), Role::Hr));
    }

    #[test]
    fn test_decide_wraps_authorize() {
        let decision = decide(&user_with(Role::Manager), Role::SuperManager);
        assert_eq!(decision, AuthorizationDecision { allowed: false });
    }

    #[test]
    fn test_unknown_required_role_fails_closed() {
        let boss = user_with(Role::SuperManager);
        assert!(!authorize_named(&boss, "root"));
        assert!(!authorize_named(&boss, ""));
        assert!(authorize_named(&boss, "manager"));
    }
}
