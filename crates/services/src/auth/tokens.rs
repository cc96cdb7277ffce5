use std::fmt::Write as _;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use study_core::model::{Role, UserId};
use uuid::Uuid;

use crate::error::AuthError;

pub const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Signing settings for access and refresh tokens.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// The authenticated caller behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted refresh token. Only `hash` is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues HS256 access tokens and opaque refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// # Errors
    ///
    /// Returns `AuthError::WeakSecret` when the secret is shorter than `MIN_SECRET_LEN` bytes.
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        let secret = config.secret.as_bytes();
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret {
                min: MIN_SECRET_LEN,
            });
        }

        // Expiry is checked against the service clock, not the system clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        })
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if encoding fails.
    pub fn issue_access(
        &self,
        user_id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let expires_at = now + self.access_ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| {
                tracing::error!(error = %e, "failed to encode access token");
                AuthError::InvalidToken
            })?;
        Ok(AccessToken { token, expires_at })
    }

    /// Decode and check an access token. The role in the claims is advisory;
    /// callers reload the user before trusting it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for bad signatures or claims and
    /// `AuthError::TokenExpired` once `exp` has passed.
    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims = data.claims;

        let exp = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;
        if exp <= now {
            return Err(AuthError::TokenExpired);
        }

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)?;
        let role = Role::parse(&claims.role).map_err(|_| AuthError::InvalidToken)?;
        Ok(Principal { user_id, role })
    }

    #[must_use]
    pub fn issue_refresh(&self, now: DateTime<Utc>) -> RefreshToken {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let hash = hash_refresh_token(&token);
        RefreshToken {
            token,
            hash,
            expires_at: now + self.refresh_ttl,
        }
    }
}

/// SHA-256 hex digest of a refresh token, as stored.
#[must_use]
pub fn hash_refresh_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::time::fixed_now;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenConfig::new("0123456789abcdef0123456789abcdef")).unwrap()
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            TokenIssuer::new(&TokenConfig::new("short")),
            Err(AuthError::WeakSecret { .. })
        ));
    }

    #[test]
    fn access_token_roundtrip_and_expiry() {
        let issuer = issuer();
        let now = fixed_now();
        let access = issuer.issue_access(UserId::new(7), Role::Admin, now).unwrap();
        assert_eq!(access.expires_at, now + Duration::minutes(15));

        let principal = issuer.verify_access(&access.token, now).unwrap();
        assert_eq!(principal.user_id, UserId::new(7));
        assert!(principal.is_admin());

        assert!(matches!(
            issuer.verify_access(&access.token, access.expires_at),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let issuer = issuer();
        let access = issuer
            .issue_access(UserId::new(1), Role::Student, fixed_now())
            .unwrap();
        let other = TokenIssuer::new(&TokenConfig::new("another-secret-that-is-long-enough!"))
            .unwrap();
        assert!(matches!(
            other.verify_access(&access.token, fixed_now()),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify_access("not.a.jwt", fixed_now()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn refresh_tokens_are_unique_and_hashed() {
        let issuer = issuer();
        let a = issuer.issue_refresh(fixed_now());
        let b = issuer.issue_refresh(fixed_now());
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 64);
        assert_eq!(a.hash, hash_refresh_token(&a.token));
        assert_eq!(a.hash.len(), 64);
        assert_eq!(a.expires_at, fixed_now() + Duration::days(7));
    }
}
