//! Bearer token issuance
//!
//! Tokens are HS256 JWTs carrying `{id, email, exp}`. The signing keys are
//! derived once at startup and shared behind `Arc`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Signing algorithm. Changing this invalidates every outstanding token.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Pre-computed JWT keys for efficient token operations
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Issues signed bearer tokens
///
/// Built without a secret, the issuer stays usable but every call fails
/// with [`TokenError::MissingSecret`]; it never signs with a fallback key.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Option<JwtKeys>,
    expiry: Duration,
}

impl TokenIssuer {
    /// Create an issuer. An empty secret counts as missing.
    pub fn new(secret: Option<&str>, expiry_secs: i64) -> Self {
        Self {
            keys: secret.filter(|s| !s.is_empty()).map(JwtKeys::new),
            expiry: Duration::seconds(expiry_secs),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.keys.is_some()
    }

    /// Issue a token for a user, valid for the configured lifetime
    #[inline]
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    fn issue_at(&self, user_id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;

        let claims = Claims {
            id: user_id.to_string(),
            email: email.to_string(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &keys.encoding).map_err(TokenError::Signing)
    }

    /// Check signature and expiry and return the claims.
    ///
    /// No route needs this yet; it pins down what a verifier must accept.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;
        let validation = Validation::new(ALGORITHM);

        decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_issuer() -> TokenIssuer {
        TokenIssuer::new(Some("test-secret"), 24 * 60 * 60)
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = create_test_issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id, "ann@x.com").unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.id, user_id.to_string());
        assert_eq!(claims.email, "ann@x.com");
    }

    #[test]
    fn test_expiry_is_twenty_four_hours() {
        let issuer = create_test_issuer();
        let now = Utc::now();

        let token = issuer.issue_at(Uuid::new_v4(), "ann@x.com", now).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.exp, now.timestamp() + 86400);
    }

    #[test]
    fn test_header_uses_hs256() {
        let token = create_test_issuer().issue(Uuid::new_v4(), "ann@x.com").unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_missing_secret_fails_every_issue() {
        for issuer in [TokenIssuer::new(None, 3600), TokenIssuer::new(Some(""), 3600)] {
            assert!(!issuer.has_secret());
            let result = issuer.issue(Uuid::new_v4(), "ann@x.com");
            assert!(matches!(result, Err(TokenError::MissingSecret)));
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_test_issuer().issue(Uuid::new_v4(), "ann@x.com").unwrap();
        let other = TokenIssuer::new(Some("another-secret"), 3600);

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = create_test_issuer();
        let two_days_ago = Utc::now() - Duration::days(2);

        let token = issuer.issue_at(Uuid::new_v4(), "ann@x.com", two_days_ago).unwrap();

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_invalid_token_rejected() {
        assert!(create_test_issuer().verify("invalid.token.here").is_err());
    }
}
