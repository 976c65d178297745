//! Bearer token issuing and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use storerate_core::UserId;

use super::AuthError;

/// Token claims. Only the user id travels in the token; role and name are
/// looked up on every request so changes apply immediately.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user_id`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Token)
    }

    /// Verify a token's signature and expiry, returning its user id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, forged or
    /// expired token.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::InvalidToken
        })?;
        data.claims
            .sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codec(secret: &str, ttl: Duration) -> TokenCodec {
        TokenCodec::new(&SecretString::from(secret.to_owned()), ttl)
    }

    #[test]
    fn test_issue_then_verify() {
        let codec = codec("k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%", Duration::hours(1));
        let token = codec.issue(UserId::new(42)).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_rejects_other_secret() {
        let a = codec("k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%", Duration::hours(1));
        let b = codec("Zr5!Qe8@Wt1#Yu4$Io7%Pa0^Sd3&Fg6*", Duration::hours(1));
        let token = a.issue(UserId::new(1)).unwrap();
        assert!(matches!(b.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_expired() {
        let codec = codec("k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%", Duration::hours(-1));
        let token = codec.issue(UserId::new(1)).unwrap();
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = codec("k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%", Duration::hours(1));
        assert!(matches!(codec.verify("not.a.jwt"), Err(AuthError::InvalidToken)));
    }
}
