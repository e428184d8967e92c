//! 会话 cookie
//!
//! 令牌只通过单个 cookie 槽位往返，对其余部分不透明

use chrono::Duration;
use http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use portal_errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct SessionCarrier {
    cookie_name: String,
    secure: bool,
}

impl SessionCarrier {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secure: true,
        }
    }

    /// 本地开发（无 TLS）时可关闭 Secure 属性
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// 读取令牌字符串；没有 cookie 或值为空时返回 `None`（匿名）
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// 写入令牌，客户端过期时间与 ttl 一致
    pub fn write(&self, headers: &mut HeaderMap, token: &str, ttl: Duration) -> AppResult<()> {
        let cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
            self.cookie_name,
            token,
            ttl.num_seconds().max(0),
            self.secure_attr()
        );
        self.append(headers, &cookie)
    }

    /// 清除令牌（登出）
    pub fn clear(&self, headers: &mut HeaderMap) -> AppResult<()> {
        let cookie = format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax{}",
            self.cookie_name,
            self.secure_attr()
        );
        self.append(headers, &cookie)
    }

    fn secure_attr(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }

    fn append(&self, headers: &mut HeaderMap, cookie: &str) -> AppResult<()> {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| AppError::internal(format!("Invalid session cookie: {}", e)))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}
