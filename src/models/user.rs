//! Bearer token claims

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims issued by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Claims for `user_id`, valid for `hours`
    pub fn new(user_id: Uuid, hours: u64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id,
            iat: now,
            exp: now + (hours as i64) * 3600,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}
