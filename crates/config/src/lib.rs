//! portal-config - 配置加载库

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

/// 会话签名密钥最小长度（字节）
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// 会话有效期上限（一年）
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// 启动时执行内嵌迁移
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_idle_timeout_secs() -> u64 {
    600
}

/// 会话配置
///
/// 签名密钥只在启动时读取一次；轮换密钥会使所有已签发的会话失效。
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub signing_secret: Secret<String>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// 仅通过 HTTPS 发送 cookie
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// 身份解析时单次用户查询的超时
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

fn default_ttl_secs() -> i64 {
    86400
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级：`default.toml` < `{APP_ENV}.toml` < `PORTAL_*` 环境变量
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("PORTAL_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 校验安全关键配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.signing_secret.expose_secret().len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "session.signing_secret must be at least {} bytes",
                MIN_SIGNING_SECRET_LEN
            )));
        }

        if self.session.ttl_secs <= 0 || self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "session.ttl_secs must be between 1 and {}",
                MAX_SESSION_TTL_SECS
            )));
        }

        if self.is_production() && !self.session.secure {
            return Err(ConfigError::Invalid(
                "session.secure must be enabled in production".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections must not exceed max_connections".to_string(),
            ));
        }

        if self.session.lookup_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.lookup_timeout_secs must be positive".to_string(),
            ));
        }

        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Invalid(
                "session.cookie_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}
