//! Password hashing and bearer tokens.
//!
//! Passwords are stored as argon2id PHC strings. Tokens are HS256 JWTs whose
//! subject is the user id; the role claim is informational only, since the
//! API reloads the user on every request.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use opsdesk_types::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Errors from hashing or token handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Argon2 parameters are out of range.
    #[error("invalid password hashing parameters: {0}")]
    Params(argon2::Error),

    /// Hashing failed or a stored hash is malformed.
    #[error("password hash error: {0}")]
    Hash(argon2::password_hash::Error),

    /// A token could not be issued.
    #[error("failed to issue token: {0}")]
    Issue(jsonwebtoken::errors::Error),

    /// A presented token is invalid or expired.
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
}

/// Argon2id password hasher with configurable cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher with the given memory cost (KiB) and iterations.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Params`] if argon2 rejects the parameters.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(AuthError::Params)?;
        Ok(Self { params })
    }

    /// Build a hasher from the auth configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Params`] if argon2 rejects the parameters.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.hash_memory_kib, config.hash_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hash`] if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(AuthError::Hash)?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string.
    ///
    /// The parameters recorded in the hash are used, so hashes made with an
    /// older cost setting keep verifying.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hash`] if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored).map_err(AuthError::Hash)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hash(e)),
        }
    }
}

/// JWT claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    /// Role at the time of issue.
    pub role: Role,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`; tokens live for `ttl`.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Create an issuer from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::hours(i64::from(config.token_ttl_hours)),
        )
    }

    /// Issue a token for `user` valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Issue`] if encoding fails.
    pub fn issue(&self, user: UserId, role: Role, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires = now.checked_add_signed(self.ttl).unwrap_or(now);
        let claims = Claims {
            sub: user,
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Issue)
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for a bad signature, malformed
    /// token, or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(1024, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = fast_hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn hashes_verify_across_cost_settings() {
        let old = fast_hasher().hash("pw").unwrap();
        let stronger = PasswordHasher::new(2048, 2).unwrap();
        assert!(stronger.verify("pw", &old).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            fast_hasher().verify("x", "not-a-phc-string"),
            Err(AuthError::Hash(_))
        ));
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(matches!(PasswordHasher::new(1, 0), Err(AuthError::Params(_))));
    }

    #[test]
    fn token_round_trip() {
        let issuer = TokenIssuer::new("secret", Duration::hours(1));
        let user = UserId::new();
        let token = issuer.issue(user, Role::Manager, Utc::now()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp.checked_sub(claims.iat), Some(3600));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("secret", Duration::hours(1));
        let issued = Utc::now().checked_sub_signed(Duration::hours(3)).unwrap();
        let token = issuer.issue(UserId::new(), Role::Admin, issued).unwrap();
        assert!(matches!(
            issuer.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let ours = TokenIssuer::new("ours", Duration::hours(1));
        let theirs = TokenIssuer::new("theirs", Duration::hours(1));
        let token = theirs.issue(UserId::new(), Role::Admin, Utc::now()).unwrap();
        assert!(ours.verify(&token).is_err());
        assert!(ours.verify("garbage").is_err());
    }
}
