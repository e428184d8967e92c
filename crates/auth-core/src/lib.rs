//! portal-auth-core - 认证核心库
//!
//! 会话令牌、会话 cookie、身份解析、角色层级授权与 Guard

mod authorizer;
mod carrier;
mod guard;
mod identity;
mod password;
mod role;
mod token;

pub use authorizer::*;
pub use carrier::*;
pub use guard::*;
pub use identity::*;
pub use password::*;
pub use role::*;
pub use token::*;
