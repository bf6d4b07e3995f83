//! services/api/src/adapters/jwt.rs
//!
//! HS256 bearer tokens implementing the `TokenService` port. Each token binds a
//! user id and email to a fixed lifetime from issuance.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quickcart_core::domain::Identity;
use quickcart_core::ports::{IssuedToken, PortError, PortResult, TokenError, TokenService};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtTokenService {
    /// Default token lifetime.
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: i64, email: &str, now: DateTime<Utc>) -> PortResult<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PortError::Unexpected(format!("failed to sign token: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: i64, email: &str) -> PortResult<IssuedToken> {
        self.issue_at(user_id, email, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(|e| {
            debug!(error = %e, "token rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        let claims = data.claims;

        let user_id = claims.sub.parse::<i64>().map_err(|_| TokenError::Invalid)?;
        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or(TokenError::Invalid)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or(TokenError::Invalid)?;

        Ok(Identity {
            user_id,
            email: claims.email,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtTokenService {
        JwtTokenService::new("test-secret", Duration::hours(JwtTokenService::DEFAULT_TTL_HOURS))
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let svc = service();
        let issued = svc.issue(42, "test@example.com").expect("issue");
        let identity = svc.verify(&issued.token).expect("verify");
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.email, "test@example.com");
        assert_eq!(identity.expires_at - identity.issued_at, Duration::hours(24));
    }

    #[test]
    fn token_past_its_lifetime_is_expired() {
        let svc = service();
        let issued = svc
            .issue_at(42, "test@example.com", Utc::now() - Duration::hours(25))
            .expect("issue");
        assert_eq!(svc.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let svc = service();
        let issued = svc.issue(42, "test@example.com").expect("issue");
        let mut parts: Vec<String> = issued.token.split('.').map(String::from).collect();
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{}{}", flipped, &sig[1..]);
        assert_eq!(svc.verify(&parts.join(".")), Err(TokenError::Invalid));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = JwtTokenService::new("another-secret", Duration::hours(24));
        let issued = other.issue(1, "a@b.co").expect("issue");
        assert_eq!(service().verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(service().verify("not-a-token"), Err(TokenError::Invalid));
        assert_eq!(service().verify(""), Err(TokenError::Invalid));
    }
}
