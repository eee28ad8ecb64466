//! JWT access tokens.
//!
//! Tokens are HS256-signed and carry the user id (`sub`), email, and role.
//! They are stateless: logout does not revoke them, they simply expire.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Role, User};

/// Token errors.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidTtl(String),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Parses the subject as a user id.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for the user.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token lifetime overflows the clock".into()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies the signature and expiry of a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

/// Longest accepted token lifetime.
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// Parses a token lifetime such as `24h`, `60m`, `3600s`, `7d`, or `3600`.
/// Lifetimes beyond [`MAX_TOKEN_TTL_DAYS`] are rejected.
pub fn parse_ttl(raw: &str) -> Result<Duration, TokenError> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: i64 = digits
        .parse()
        .map_err(|_| TokenError::InvalidTtl(raw.to_string()))?;
    if value <= 0 {
        return Err(TokenError::InvalidTtl(raw.to_string()));
    }

    let ttl = match unit.trim() {
        "" | "s" => Duration::try_seconds(value),
        "m" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        _ => None,
    };

    match ttl {
        Some(ttl) if ttl <= Duration::days(MAX_TOKEN_TTL_DAYS) => Ok(ttl),
        _ => Err(TokenError::InvalidTtl(raw.to_string())),
    }
}
