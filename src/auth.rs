use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Role, User};

pub const ISSUER: &str = "huddle";
pub const AUDIENCE: &str = "huddle/api";

/// The verified identity a token carries. Token validity says nothing about
/// account validity. Callers must still confirm the subject exists and is
/// active before acting on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Signing key misconfiguration. Fatal, not retryable.
    Key,
    Expired,
    Malformed,
    MissingSubject,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Key => write!(f, "signing key misconfigured"),
            AuthError::Expired => write!(f, "token expired"),
            AuthError::Malformed => write!(f, "malformed token"),
            AuthError::MissingSubject => write!(f, "token has no subject"),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    role: Role,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

/// Issues and verifies signed, expiring identity tokens (HS256).
/// The sole owner of token internals; nothing else inspects claims.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self, AuthError> {
        if secret.is_empty() || ttl_hours <= 0 {
            return Err(AuthError::Key);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        // Expiry boundaries matter here; no clock-skew grace.
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds: ttl_hours * 3600,
        })
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &User, issued_at: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: Some(user.id.to_string()),
            role: user.role,
            iat: issued_at,
            exp: issued_at + self.ttl_seconds,
            iss: ISSUER.into(),
            aud: AUDIENCE.into(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| AuthError::Key)
    }

    /// Pure cryptographic/structural check; never consults the store.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            }
        })?;
        let sub = data
            .claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingSubject)?;
        let id = Uuid::parse_str(&sub).map_err(|_| AuthError::MissingSubject)?;
        Ok(Identity {
            id,
            role: data.claims.role,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::Key)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
