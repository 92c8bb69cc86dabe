use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_JWT_TTL_SECS};

pub mod password;

pub use password::{hash_password, verify_password};

/// Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Reader,
    Editor,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "Reader",
            Role::Editor => "Editor",
            Role::Administrator => "Administrator",
        }
    }

    pub fn allows(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" | "lector" => Ok(Role::Reader),
            "editor" => Ok(Role::Editor),
            "administrator" | "admin" | "administrador" => Ok(Role::Administrator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User is not active")]
    InactiveUser,

    #[error("Requires {required} role")]
    Forbidden { required: Role },

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Signing material plus token lifetime, built once from config.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs.clamp(-MAX_JWT_TTL_SECS, MAX_JWT_TTL_SECS)),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.jwt_secret, security.jwt_expires_in_secs)
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy() {
        assert!(Role::Administrator.allows(Role::Editor));
        assert!(Role::Editor.allows(Role::Editor));
        assert!(!Role::Reader.allows(Role::Editor));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Administrator));
    }

    #[test]
    fn issues_and_verifies_tokens() {
        let keys = JwtKeys::new("test-secret", 3600);
        let id = Uuid::new_v4();
        let token = keys.issue(id, "ana@example.com", Role::Editor).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Editor);

        let other = JwtKeys::new("other-secret", 3600);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        // Past the default 60s leeway
        let keys = JwtKeys::new("test-secret", -120);
        let token = keys.issue(Uuid::new_v4(), "ana@example.com", Role::Reader).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn oversized_lifetimes_are_clamped() {
        let keys = JwtKeys::new("test-secret", i64::MAX);
        assert_eq!(keys.ttl_secs(), MAX_JWT_TTL_SECS);
        assert!(keys.issue(Uuid::new_v4(), "ana@example.com", Role::Reader).is_ok());
    }
}
