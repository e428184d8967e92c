//! portal-adapter-postgres - PostgreSQL 适配器

mod connection;
mod user_store;

pub use connection::*;
pub use user_store::*;
