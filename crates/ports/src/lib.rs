//! ports - 抽象 trait 层
//!
//! 定义认证链路依赖的外部协作者接口

mod memory;
mod user_store;

pub use memory::*;
pub use user_store::*;
