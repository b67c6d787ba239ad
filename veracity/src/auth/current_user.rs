//! Dual-path request authentication.
//!
//! Two credential paths resolve to the same identity shape: a bearer API key
//! (programmatic callers) or a session cookie (the dashboard). A malformed
//! bearer token is rejected outright and never falls back to the cookie path,
//! so a bad key cannot silently ride an ambient session. Tier and quota state
//! are resolved here so every gated handler receives them ready-made.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;

use crate::crypto::API_KEY_SCHEME;
use crate::db::errors::DbError;
use crate::db::handlers::{ApiKeys, Users};
use crate::errors::{Error, Result};
use crate::quota::QuotaStatus;
use crate::tasks::SideEffect;
use crate::types::{ApiKeyId, AuthMethod, Tier, UserId};
use crate::AppState;

/// Everything downstream handlers need to know about the caller.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
    pub tier: Tier,
    pub is_admin: bool,
    pub method: AuthMethod,
    /// Set only on the API-key path
    pub api_key_id: Option<ApiKeyId>,
    /// Quota snapshot taken at authentication time
    pub quota: QuotaStatus,
}

impl AuthContext {
    /// Enforce the monthly ceiling. Gated handlers call this before doing any
    /// work; informational endpoints (usage, job polling) skip it.
    pub fn ensure_quota(&self) -> Result<()> {
        if !self.quota.allowed() {
            return Err(Error::QuotaExceeded {
                status: self.quota.clone(),
            });
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<()> {
        if !self.is_admin {
            return Err(Error::Forbidden {
                message: "Administrator access required".to_string(),
            });
        }
        Ok(())
    }
}

/// The identity a credential resolved to, before tier and quota enrichment.
struct ResolvedIdentity {
    user_id: UserId,
    method: AuthMethod,
    api_key_id: Option<ApiKeyId>,
}

async fn resolve_bearer(state: &AppState, header_value: &str) -> Result<ResolvedIdentity> {
    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| Error::Unauthenticated {
        message: Some("Malformed Authorization header".to_string()),
    })?;

    // A bearer token that is not key material is rejected here; there is no
    // fallback to the cookie path once an Authorization header is present.
    if !token.starts_with(API_KEY_SCHEME) {
        return Err(Error::Unauthenticated {
            message: Some("Malformed API key".to_string()),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let validated = ApiKeys::new(&mut conn)
        .validate(token)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid or revoked API key".to_string()),
        })?;

    state.tasks.dispatch(SideEffect::StampKeyUsage {
        key_id: validated.key_id,
    });

    Ok(ResolvedIdentity {
        user_id: validated.user_id,
        method: AuthMethod::ApiKey,
        api_key_id: Some(validated.key_id),
    })
}

fn resolve_session(state: &AppState, parts: &Parts) -> Result<ResolvedIdentity> {
    let cookie_header = parts
        .headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::Unauthenticated { message: None })?;

    let cookie_name = &state.config.auth.session_cookie_name;
    let token = cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name == cookie_name)
        .map(|(_, value)| value)
        .ok_or(Error::Unauthenticated { message: None })?;

    let secret = state.config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "verify session without a configured secret key".to_string(),
    })?;

    let claims = super::session::verify_session_token(token, secret)?;
    Ok(ResolvedIdentity {
        user_id: claims.sub,
        method: AuthMethod::Session,
        api_key_id: None,
    })
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let identity = match parts.headers.get(AUTHORIZATION) {
            Some(value) => {
                let value = value.to_str().map_err(|_| Error::Unauthenticated {
                    message: Some("Malformed Authorization header".to_string()),
                })?;
                resolve_bearer(state, value).await?
            }
            None => resolve_session(state, parts)?,
        };

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let user = Users::new(&mut conn)
            .get_by_id(identity.user_id)
            .await?
            .ok_or(Error::Unauthenticated {
                message: Some("Unknown user".to_string()),
            })?;
        drop(conn);

        let tier = state.tier_resolver.resolve(identity.user_id).await?;
        let quota = state.quota.status(identity.user_id, tier).await?;

        Ok(AuthContext {
            user_id: identity.user_id,
            email: user.email,
            tier,
            is_admin: user.is_admin,
            method: identity.method,
            api_key_id: identity.api_key_id,
            quota,
        })
    }
}
