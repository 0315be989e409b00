//! Signed, time-bounded password-reset tokens.
//!
//! Stateless by design: the token binds the principal id and a purpose
//! discriminator under an HMAC signature, so issuing never writes storage
//! and each link carries exactly one token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::error::ServiceError;

const RESET_PURPOSE: &str = "password_reset";

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: i64,
    purpose: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct ResetTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity_secs: i64,
}

impl ResetTokenService {
    pub fn new(secret: &str, validity_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validity_secs,
        }
    }

    pub fn issue(&self, principal_id: i64) -> Result<String, ServiceError> {
        self.issue_at(principal_id, Utc::now())
    }

    fn issue_at(
        &self,
        principal_id: i64,
        issued_utc: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let claims = ResetClaims {
            sub: principal_id,
            purpose: RESET_PURPOSE.to_string(),
            iat: issued_utc.timestamp(),
            exp: (issued_utc + Duration::seconds(self.validity_secs)).timestamp(),
        };
        encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))
    }

    /// Verify a token and return the bound principal id.
    ///
    /// Zero leeway: a token presented one tick past its validity window is
    /// `ExpiredToken`, any other defect is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<i64, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<ResetClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::ExpiredToken,
                _ => ServiceError::InvalidToken,
            }
        })?;

        if data.claims.purpose != RESET_PURPOSE {
            return Err(ServiceError::InvalidToken);
        }
        Ok(data.claims.sub)
    }
}
