//! Signed, time-limited session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id, username and role. The
//! secret and lifetime are fixed when the service is built and never change
//! for the life of the process.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;
use tracing::warn;

use crate::config::{MAX_TOKEN_TTL_HOURS, SecurityConfig};
use crate::domain::{Identity, Role, UserId};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is invalid")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Builds the service from configuration, generating a throwaway secret
    /// when none is configured.
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        let ttl = Duration::hours(config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS));
        match config.token_secret.as_deref() {
            Some(secret) => Self::new(secret.as_bytes(), ttl),
            None => {
                warn!("No token secret configured; sessions will not survive a restart");
                Self::new(random_secret().as_bytes(), ttl)
            }
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token as if it had been minted at `issued_at`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;
        let claims = Claims {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let user_id: i32 = data.claims.sub.parse().map_err(|_| TokenError::Invalid)?;
        if user_id < 0 {
            return Err(TokenError::Invalid);
        }

        Ok(Identity {
            user_id: UserId::new(user_id),
            username: data.claims.username,
            role: data.claims.role,
        })
    }
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"an-adequately-long-test-secret-value!!", Duration::hours(24))
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: UserId::new(7),
            username: "mika".to_string(),
            role,
        }
    }

    #[test]
    fn issue_then_verify_returns_identity() {
        let svc = service();
        let issued = svc.issue(&identity(Role::Admin)).unwrap();
        assert_eq!(issued.token.matches('.').count(), 2);

        let verified = svc.verify(&issued.token).unwrap();
        assert_eq!(verified, identity(Role::Admin));
    }

    #[test]
    fn oversized_lifetimes_never_panic() {
        let config = SecurityConfig {
            token_ttl_hours: i64::MAX,
            ..SecurityConfig::default()
        };
        let svc = TokenService::from_config(&config);
        let issued = svc.issue(&identity(Role::User)).unwrap();
        assert!(issued.expires_at <= Utc::now() + Duration::hours(MAX_TOKEN_TTL_HOURS));

        let err = service()
            .issue_at(&identity(Role::User), DateTime::<Utc>::MAX_UTC)
            .unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn lifetime_is_twenty_four_hours() {
        let svc = service();
        let now = Utc::now();
        let issued = svc.issue_at(&identity(Role::User), now).unwrap();
        assert_eq!(issued.expires_at - now, Duration::hours(24));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let svc = service();
        let issued = svc
            .issue_at(&identity(Role::User), Utc::now() - Duration::hours(25))
            .unwrap();
        assert_eq!(svc.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let svc = service();
        let issued = svc.issue(&identity(Role::User)).unwrap();

        let other = TokenService::new(b"a-completely-different-secret-value", Duration::hours(1));
        assert_eq!(other.verify(&issued.token), Err(TokenError::Invalid));

        // Admin claims spliced onto a user token's signature.
        let admin = svc.issue(&identity(Role::Admin)).unwrap();
        let user_parts: Vec<&str> = issued.token.split('.').collect();
        let admin_parts: Vec<&str> = admin.token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);
        assert_eq!(svc.verify(&forged), Err(TokenError::Invalid));

        assert_eq!(svc.verify("not-a-token"), Err(TokenError::Invalid));
        assert_eq!(svc.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn generated_secret_is_hex() {
        let secret = random_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, random_secret());
    }
}
