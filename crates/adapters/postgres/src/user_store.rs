//! PostgreSQL 用户存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_common::UserId;
use portal_errors::{AppError, AppResult};
use portal_ports::{FindOptions, UserRecord, UserStore};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

const SELECT_USER: &str = r#"
    SELECT id, name, email, password_hash, role, department, job_title,
           phone, address, created_at, deleted_at
    FROM users
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    department: Option<String>,
    job_title: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            department: row.department,
            job_title: row.job_title,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &UserId, options: FindOptions) -> AppResult<Option<UserRecord>> {
        debug!(user_id = %id, "Loading user by id");

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE id = $1 AND (NOT $2 OR deleted_at IS NULL) LIMIT 1",
            SELECT_USER
        ))
        .bind(id.0)
        .bind(options.exclude_soft_deleted)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_email(
        &self,
        email: &str,
        options: FindOptions,
    ) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE email = $1 AND (NOT $2 OR deleted_at IS NULL) LIMIT 1",
            SELECT_USER
        ))
        .bind(email)
        .bind(options.exclude_soft_deleted)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserRecord::from))
    }

    async fn list_active(&self) -> AppResult<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE deleted_at IS NULL ORDER BY created_at DESC",
            SELECT_USER
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {}", e)))?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }
}
