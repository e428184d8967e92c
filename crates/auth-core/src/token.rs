//! 会话令牌编解码
//!
//! 线格式：`base64url(JSON{sub, exp})` + `.` + HMAC-SHA256 签名。
//! 签名覆盖编码后的 payload 段本身，先验签再解析。
//! 对已签发令牌的任意字节改动都表现为验签失败。
//! 解码不检查过期，过期由身份解析负责。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, crypto};
use portal_common::UserId;
use portal_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ALGORITHM: Algorithm = Algorithm::HS256;
const SEPARATOR: char = '.';

/// 解码错误
///
/// 仅在编解码层内部区分；身份解析统一视为匿名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed session token")]
    Malformed,

    #[error("session token signature mismatch")]
    BadSignature,
}

/// 令牌 payload
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// Subject (user ID)
    sub: String,
    /// Expiration time (unix seconds)
    exp: i64,
}

/// 已签名的会话令牌，签发后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    subject: UserId,
    expires_at: DateTime<Utc>,
    payload: String,
    signature: String,
}

impl SessionToken {
    pub fn subject(&self) -> &UserId {
        &self.subject
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// base64url 编码的签名
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// `now >= expires_at` 即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 序列化为线格式
    pub fn serialize(&self) -> String {
        format!("{}{}{}", self.payload, SEPARATOR, self.signature)
    }
}

/// 令牌编解码器
///
/// 持有进程级签名密钥，启动后只读
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// 签发令牌，`expires_at = now + ttl`
    pub fn issue(&self, subject: &UserId, ttl: Duration) -> AppResult<SessionToken> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// 以指定时间签发令牌（秒级精度）
    pub fn issue_at(
        &self,
        subject: &UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<SessionToken> {
        let expires_at = now
            .checked_add_signed(ttl)
            .and_then(|t| DateTime::from_timestamp(t.timestamp(), 0))
            .ok_or_else(|| AppError::internal("Session expiry out of range"))?;

        let claims = SessionClaims {
            sub: subject.to_string(),
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| AppError::internal(format!("Failed to encode session claims: {}", e)))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let signature = crypto::sign(payload.as_bytes(), &self.encoding_key, ALGORITHM)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {}", e)))?;

        Ok(SessionToken {
            subject: subject.clone(),
            expires_at,
            payload,
            signature,
        })
    }

    /// 解码并验签
    ///
    /// 空输入为 `Malformed`；其余输入先验签，验签失败一律为 `BadSignature`，
    /// 验签通过但 payload 无法解析才是 `Malformed`
    pub fn decode(&self, serialized: &str) -> Result<SessionToken, DecodeError> {
        if serialized.is_empty() {
            return Err(DecodeError::Malformed);
        }

        // 签名段不含分隔符，按最后一个分隔符切分
        let (payload, signature) = serialized
            .rsplit_once(SEPARATOR)
            .unwrap_or((serialized, ""));

        let verified = !signature.is_empty()
            && crypto::verify(signature, payload.as_bytes(), &self.decoding_key, ALGORITHM)
                .unwrap_or(false);
        if !verified {
            return Err(DecodeError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| DecodeError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| DecodeError::Malformed)?;
        let subject = UserId::from_string(&claims.sub).map_err(|_| DecodeError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(DecodeError::Malformed)?;

        Ok(SessionToken {
            subject,
            expires_at,
            payload: payload.to_string(),
            signature: signature.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> SessionCodec {
        SessionCodec::new(SECRET)
    }

    /// 替换为 base64url 字母表中另一个字符
    fn flip(c: u8) -> u8 {
        if c == b'A' { b'B' } else { b'A' }
    }

    #[test]
    fn test_issue_then_decode_preserves_claims() {
        let subject = UserId::new();
        for ttl in [Duration::seconds(1), Duration::hours(1), Duration::days(30)] {
            let token = codec().issue(&subject, ttl).unwrap();
            let decoded = codec().decode(&token.serialize()).unwrap();

            assert_eq!(decoded.subject(), &subject);
            assert_eq!(decoded.expires_at(), token.expires_at());
            assert_eq!(decoded.signature(), token.signature());
            assert_eq!(decoded, token);
        }
    }

    #[test]
    fn test_expires_at_is_now_plus_ttl_in_whole_seconds() {
        let now = DateTime::from_timestamp(1_700_000_000, 750_000_000).unwrap();
        let token = codec()
            .issue_at(&UserId::new(), Duration::seconds(90), now)
            .unwrap();
        assert_eq!(token.expires_at().timestamp(), 1_700_000_090);
        assert_eq!(token.expires_at().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_any_mutated_byte_fails_signature() {
        let token = codec().issue(&UserId::new(), Duration::hours(1)).unwrap();
        let wire = token.serialize();

        for i in 0..wire.len() {
            for replacement in [b'A', b'B', b'.', b'-', b'_', b'0'] {
                if wire.as_bytes()[i] == replacement {
                    continue;
                }
                let mut bytes = wire.clone().into_bytes();
                bytes[i] = replacement;
                let mutated = String::from_utf8(bytes).unwrap();

                assert_eq!(
                    codec().decode(&mutated),
                    Err(DecodeError::BadSignature),
                    "byte {} -> {:?}",
                    i,
                    replacement as char
                );
            }
        }
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert_eq!(codec().decode(""), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_unsigned_input_is_bad_signature() {
        for input in [".", "abc", "abc.", ".abc", "a.b.c"] {
            assert_eq!(
                codec().decode(input),
                Err(DecodeError::BadSignature),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn test_other_secret_is_bad_signature() {
        let token = codec().issue(&UserId::new(), Duration::hours(1)).unwrap();
        let rotated = SessionCodec::new(b"ffffffffffffffffffffffffffffffff");
        assert_eq!(rotated.decode(&token.serialize()), Err(DecodeError::BadSignature));
    }

    #[test]
    fn test_signed_garbage_payload_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"not-a-uuid","exp":1}"#);
        let signature = crypto::sign(payload.as_bytes(), &EncodingKey::from_secret(SECRET), ALGORITHM)
            .unwrap();
        let wire = format!("{}.{}", payload, signature);
        assert_eq!(codec().decode(&wire), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_decode_does_not_check_expiry() {
        let token = codec().issue(&UserId::new(), Duration::seconds(-1)).unwrap();
        let decoded = codec().decode(&token.serialize()).unwrap();
        assert!(decoded.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_issue_is_deterministic_for_same_key() {
        let subject = UserId::new();
        let now = Utc::now();
        let a = codec().issue_at(&subject, Duration::minutes(5), now).unwrap();
        let b = codec().issue_at(&subject, Duration::minutes(5), now).unwrap();
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = codec().issue_at(&UserId::new(), Duration::seconds(10), now).unwrap();
        assert!(!token.is_expired_at(now + Duration::seconds(9)));
        assert!(token.is_expired_at(now + Duration::seconds(10)));
    }
}
