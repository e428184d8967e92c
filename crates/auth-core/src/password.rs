//! 凭证哈希
//!
//! 仅在登录时使用；存储格式为 Argon2id PHC 字符串

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use portal_errors::{AppError, AppResult};
use std::sync::OnceLock;

/// 账号不存在时用于校验的占位明文
const DUMMY_CREDENTIAL: &str = "portal-dummy-credential";

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// 与真实哈希同参数的占位哈希，进程内只生成一次
fn dummy_hash() -> AppResult<&'static str> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash.as_str());
    }
    let hash = CredentialHasher::hash(DUMMY_CREDENTIAL)?;
    Ok(DUMMY_HASH.get_or_init(|| hash).as_str())
}

pub struct CredentialHasher;

impl CredentialHasher {
    /// 哈希明文密码
    pub fn hash(plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))
    }

    /// 验证明文密码是否匹配
    pub fn verify(plain: &str, phc: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(phc)
            .map_err(|e| AppError::internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// 验证可能不存在的凭证
    ///
    /// `phc` 为 `None` 时仍对占位哈希执行一次完整校验并返回 `false`，
    /// 使“账号不存在”与“密码错误”耗时一致
    pub fn verify_optional(plain: &str, phc: Option<&str>) -> AppResult<bool> {
        match phc {
            Some(phc) => Self::verify(plain, phc),
            None => {
                Self::verify(plain, dummy_hash()?)?;
                Ok(false)
            }
        }
    }

    /// 启动时预先生成占位哈希
    pub fn warm_up() -> AppResult<()> {
        dummy_hash().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = CredentialHasher::hash("MiQSecure123!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(CredentialHasher::verify("MiQSecure123!", &hash).unwrap());
        assert!(!CredentialHasher::verify("miqsecure123!", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let a = CredentialHasher::hash("correct horse").unwrap();
        let b = CredentialHasher::hash("correct horse").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_credential_never_verifies() {
        assert!(!CredentialHasher::verify_optional(DUMMY_CREDENTIAL, None).unwrap());
        assert!(!CredentialHasher::verify_optional("anything", None).unwrap());

        let hash = CredentialHasher::hash("MiQSecure123!").unwrap();
        assert!(CredentialHasher::verify_optional("MiQSecure123!", Some(&hash)).unwrap());
    }

    #[test]
    fn test_dummy_hash_matches_real_cost_parameters() {
        CredentialHasher::warm_up().unwrap();
        let dummy = PasswordHash::new(dummy_hash().unwrap()).unwrap();
        let real_hash = CredentialHasher::hash("correct horse").unwrap();
        let real = PasswordHash::new(&real_hash).unwrap();

        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.version, real.version);
        assert_eq!(dummy.params, real.params);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let err = CredentialHasher::verify("anything", "plaintext-in-db").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
