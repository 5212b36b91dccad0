//! 凭证校验服务
//!
//! 网关只需要协作方认证服务的 `verify(credential) -> userId` 边界:
//! 凭证是携带用户ID与过期时间的 HS256 bearer token。

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{RippleError, RippleResult};

/// 访问凭证声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: String,
    /// 过期时间 (Unix 秒)
    pub exp: i64,
}

/// Token 校验服务
///
/// 凭证签发属于被排除的认证协作方,这里保留签发入口仅用于
/// 测试与本地联调。
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// 校验凭证,返回其中绑定的用户ID
    pub fn verify(&self, token: &str) -> RippleResult<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| RippleError::AuthFailure(format!("invalid access token: {err}")))?;
        Ok(data.claims.sub)
    }

    /// 为指定用户签发凭证 (测试与本地联调用)
    pub fn issue(&self, user_id: &str, ttl_seconds: i64) -> RippleResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: chrono::Utc::now().timestamp() + ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| RippleError::AuthFailure(format!("failed to issue token: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_the_same_user() {
        let service = TokenService::new("test-secret");
        let token = service.issue("u1", 60).unwrap();
        assert_eq!(service.verify(&token).unwrap(), "u1");
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new("test-secret");
        let token = service.issue("u1", -120).unwrap();
        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, RippleError::AuthFailure(_)));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = TokenService::new("other-secret");
        let verifier = TokenService::new("test-secret");
        let token = issuer.issue("u1", 60).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(RippleError::AuthFailure(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = TokenService::new("test-secret");
        assert!(matches!(
            service.verify("not-a-jwt"),
            Err(RippleError::AuthFailure(_))
        ));
    }
}
