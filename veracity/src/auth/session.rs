//! Browser session tokens.
//!
//! Sessions are short-lived JWTs set as a cookie by the dashboard's login
//! flow. This service only verifies them; issuance lives here too so tests
//! and the login handler share one claim shape.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id
    pub sub: UserId,
    pub email: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued-at, seconds since epoch
    pub iat: i64,
}

pub fn create_session_token(user_id: UserId, email: &str, secret: &str, expiry_secs: u64) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id,
        email: email.to_string(),
        exp: now + expiry_secs as i64,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| Error::Internal {
        operation: format!("sign session token: {e}"),
    })
}

/// Verify a session token's signature and expiry. All failure modes collapse
/// into Unauthenticated so callers cannot distinguish forged from expired.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims> {
    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| Error::Unauthenticated {
            message: Some("Invalid or expired session".to_string()),
        })
}
