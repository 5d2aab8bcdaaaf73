//! Session tokens: HS256 over {account_id, username, iat, nbf, exp = iat + 24h}.
//! A token is only admitted while it equals the account's stored token, so
//! issuing a new one revokes every older one immediately.

use crate::error::AppError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub account_id: i64,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate(&self, account_id: i64, username: &str) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            account_id,
            username: username.to_string(),
            iat: now,
            nbf: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Signature, expiration and not-before are all enforced; any failure is
    /// the same user-visible rejection.
    pub fn parse(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let keys = TokenKeys::from_secret("test-secret");
        let token = keys.generate(42, "alice").unwrap();
        let claims = keys.parse(&token).unwrap();
        assert_eq!(claims.account_id, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECS);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn wrong_secret_rejected() {
        let keys = TokenKeys::from_secret("secret-a");
        let other = TokenKeys::from_secret("secret-b");
        let token = keys.generate(1, "bob").unwrap();
        assert!(other.parse(&token).is_err());
    }

    #[test]
    fn garbage_rejected() {
        let keys = TokenKeys::from_secret("test-secret");
        assert!(keys.parse("not-a-token").is_err());
    }
}
