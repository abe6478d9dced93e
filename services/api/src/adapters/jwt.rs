//! services/api/src/adapters/jwt.rs
//!
//! Implements the `TokenService` port with HMAC-signed JSON Web Tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use posh_training_core::{Identity, IssuedToken, PortError, PortResult, TokenService};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtTokenAdapter {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtTokenAdapter {
    /// Creates a new `JwtTokenAdapter`. `algorithm` must be one of the HS family.
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            ttl,
        }
    }
}

impl TokenService for JwtTokenAdapter {
    fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> PortResult<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            email: identity.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    fn verify(&self, token: &str) -> PortResult<Identity> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            PortError::Unauthorized
        })?;
        Identity::parse(&data.claims.email).map_err(|_| PortError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(secret: &str) -> JwtTokenAdapter {
        JwtTokenAdapter::new(secret.as_bytes(), Algorithm::HS256, Duration::minutes(30))
    }

    fn alice() -> Identity {
        Identity::parse("alice@example.com").unwrap()
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let tokens = adapter("secret");
        let now = Utc::now();
        let issued = tokens.issue(&alice(), now).unwrap();

        assert_eq!(issued.expires_at, now + Duration::minutes(30));
        assert_eq!(tokens.verify(&issued.access_token).unwrap(), alice());
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let tokens = adapter("secret");
        let issued = tokens.issue(&alice(), Utc::now() - Duration::hours(2)).unwrap();
        assert_eq!(tokens.verify(&issued.access_token), Err(PortError::Unauthorized));
    }

    #[test]
    fn token_from_another_key_is_unauthorized() {
        let issued = adapter("other").issue(&alice(), Utc::now()).unwrap();
        assert_eq!(adapter("secret").verify(&issued.access_token), Err(PortError::Unauthorized));
    }

    #[test]
    fn garbage_is_unauthorized() {
        assert_eq!(adapter("secret").verify("not.a.jwt"), Err(PortError::Unauthorized));
    }
}
