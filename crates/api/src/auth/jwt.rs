//! JWT validation

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Role: "user" or "operator"
    #[serde(default = "default_role")]
    pub role: String,
    /// Expiry as unix timestamp
    pub exp: usize,
}

fn default_role() -> String {
    "user".to_string()
}

/// Validates access tokens issued by the auth service
#[derive(Clone)]
pub struct JwtManager {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(role: &str, exp_offset_secs: i64) -> Claims {
        let exp = (time::OffsetDateTime::now_utc().unix_timestamp() + exp_offset_secs) as usize;
        Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            exp,
        }
    }

    #[test]
    fn test_valid_token_round_trips() {
        let manager = JwtManager::new("test-secret");
        let claims = claims("user", 3600);
        let verified = manager.verify_token(&token("test-secret", &claims)).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.role, "user");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new("test-secret");
        let claims = claims("user", 3600);
        assert!(manager.verify_token(&token("other-secret", &claims)).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret");
        let claims = claims("user", -3600);
        assert!(manager.verify_token(&token("test-secret", &claims)).is_err());
    }
}
