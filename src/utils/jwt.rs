use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use chrono::{Duration, Utc};
use crate::errors::AppError;
use crate::identity::Principal;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Principal email; roles are re-read from the identity store per request
    pub exp: usize, // Expiration timestamp
}

/// Signing material plus the session lifetime, built once from config.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn generate_token(&self, principal: &Principal) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("Invalid timestamp".to_string()))?
            .timestamp() as usize;

        let claims = Claims {
            sub: principal.email.clone(),
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(jsonwebtoken::Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|err| AppError::Unauthorized(err.to_string()))
    }
}
