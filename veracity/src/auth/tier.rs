//! Tier resolution behind a trait seam.
//!
//! Entitlements live on the user row today, but the seam keeps billing-system
//! lookups out of the authenticator: swapping the resolver changes where tiers
//! come from without touching request handling.

use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::warn;

use crate::db::errors::DbError;
use crate::db::handlers::Users;
use crate::errors::{Error, Result};
use crate::types::{abbrev_uuid, Tier, UserId};

#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn resolve(&self, user_id: UserId) -> Result<Tier>;
}

/// Fixed-tier resolver for tests and single-tenant deployments.
pub struct StubTierResolver(pub Tier);

#[async_trait]
impl TierResolver for StubTierResolver {
    async fn resolve(&self, _user_id: UserId) -> Result<Tier> {
        Ok(self.0)
    }
}

/// Reads the tier column off the user row. An unrecognized stored value
/// degrades to Free rather than locking the account out.
pub struct DbTierResolver {
    db: PgPool,
}

impl DbTierResolver {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TierResolver for DbTierResolver {
    async fn resolve(&self, user_id: UserId) -> Result<Tier> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let user = Users::new(&mut conn)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::Unauthenticated {
                message: Some("Unknown user".to_string()),
            })?;

        Ok(Tier::from_str(&user.tier).unwrap_or_else(|_| {
            warn!("user {} has unrecognized tier '{}', treating as free", abbrev_uuid(&user_id), user.tier);
            Tier::Free
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::users::UserCreateDBRequest;
    use uuid::Uuid;

    #[tokio::test]
    async fn stub_resolver_returns_its_tier() {
        let resolver = StubTierResolver(Tier::Pro);
        assert_eq!(resolver.resolve(Uuid::new_v4()).await.unwrap(), Tier::Pro);
    }

    #[sqlx::test]
    async fn db_resolver_reads_the_user_row(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: "tier@example.com".to_string(),
                tier: "enterprise".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();

        let resolver = DbTierResolver::new(pool);
        assert_eq!(resolver.resolve(user.id).await.unwrap(), Tier::Enterprise);
        assert!(resolver.resolve(Uuid::new_v4()).await.is_err());
    }

    #[sqlx::test]
    async fn unrecognized_tier_degrades_to_free(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: "odd@example.com".to_string(),
                tier: "platinum".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();

        let resolver = DbTierResolver::new(pool);
        assert_eq!(resolver.resolve(user.id).await.unwrap(), Tier::Free);
    }
}
