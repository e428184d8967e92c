//! 角色层级
//!
//! 全序、固定：employee < hr < manager < super_manager。
//! 所有角色比较都经过 `rank`。

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Hr,
    Manager,
    SuperManager,
}

impl Role {
    /// 按权限从低到高排列
    pub const ALL: [Role; 4] = [Role::Employee, Role::Hr, Role::Manager, Role::SuperManager];

    /// 权限等级，严格递增
    pub const fn rank(self) -> u8 {
        match self {
            Role::Employee => 1,
            Role::Hr => 2,
            Role::Manager => 3,
            Role::SuperManager => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::SuperManager => "super_manager",
        }
    }

    /// 解析存储或配置中的角色名，未知名称返回 `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Role::Employee),
            "hr" => Some(Role::Hr),
            "manager" => Some(Role::Manager),
            "super_manager" => Some(Role::SuperManager),
            _ => None,
        }
    }

    /// 是否满足 `required` 的要求
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
