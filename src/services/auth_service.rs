//! Authentication service - Verifies bearer tokens issued by the directory.
//!
//! Tokens are minted elsewhere; the engine only checks the signature and
//! expiry and reads the subject and role.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::EmployeeRole;
use crate::errors::AppResult;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn role(&self) -> EmployeeRole {
        EmployeeRole::from(self.role.as_str())
    }
}

/// Authentication service trait for dependency injection.
pub trait AuthService: Send + Sync {
    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// HMAC token verifier.
pub struct TokenVerifier {
    key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jwt_secret_bytes())
    }
}

impl AuthService for TokenVerifier {
    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(token, &self.key, &Validation::default())?;
        Ok(token_data.claims)
    }
}
