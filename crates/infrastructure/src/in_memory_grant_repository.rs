use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use accesstrack_application::{GrantQuery, GrantRepository, NewGrant};
use accesstrack_core::{AppError, AppResult};
use accesstrack_domain::{AccessGrant, GrantId, GrantKey, GrantStatus};

/// In-memory grant storage for tests and local development.
///
/// Mirrors the PostgreSQL adapter's transactional contract: a batch
/// insert that would violate active-grant uniqueness inserts nothing.
#[derive(Debug, Default)]
pub struct InMemoryGrantRepository {
    grants: RwLock<Vec<AccessGrant>>,
}

impl InMemoryGrantRepository {
    /// Creates an empty in-memory grant store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantRepository for InMemoryGrantRepository {
    async fn list_active_grant_keys(&self) -> AppResult<Vec<GrantKey>> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active)
            .map(AccessGrant::key)
            .collect())
    }

    async fn count_active_for_key(&self, key: &GrantKey) -> AppResult<u64> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active && &grant.key() == key)
            .count() as u64)
    }

    async fn insert_grants_atomically(&self, new_grants: Vec<NewGrant>) -> AppResult<u64> {
        let mut grants = self.grants.write().await;

        let mut active_keys: Vec<GrantKey> = grants
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active)
            .map(AccessGrant::key)
            .collect();
        for new_grant in &new_grants {
            let key = GrantKey {
                user_id: new_grant.user_id,
                system_id: new_grant.system_id,
                tier_id: new_grant.tier_id,
                instance_id: new_grant.instance_id,
            };
            if active_keys.contains(&key) {
                return Err(AppError::Conflict(
                    "an active grant already exists for this user, system, tier, and instance scope"
                        .to_owned(),
                ));
            }
            active_keys.push(key);
        }

        let inserted = new_grants.len() as u64;
        for new_grant in new_grants {
            grants.push(AccessGrant {
                id: new_grant.id,
                user_id: new_grant.user_id,
                system_id: new_grant.system_id,
                tier_id: new_grant.tier_id,
                instance_id: new_grant.instance_id,
                status: GrantStatus::Active,
                granted_by: new_grant.granted_by,
                granted_at: new_grant.granted_at,
                removed_at: None,
                notes: new_grant.notes,
            });
        }

        Ok(inserted)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .find(|grant| grant.id == grant_id)
            .cloned())
    }

    async fn mark_removed(
        &self,
        grant_id: GrantId,
        removed_at: DateTime<Utc>,
    ) -> AppResult<AccessGrant> {
        let mut grants = self.grants.write().await;
        let grant = grants
            .iter_mut()
            .find(|grant| grant.id == grant_id)
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}'")))?;

        grant.mark_removed(removed_at)?;
        Ok(grant.clone())
    }

    async fn list_grants(&self, query: GrantQuery) -> AppResult<Vec<AccessGrant>> {
        let mut matching: Vec<AccessGrant> = self
            .grants
            .read()
            .await
            .iter()
            .filter(|grant| {
                query.user_id.is_none_or(|user_id| grant.user_id == user_id)
                    && query
                        .system_id
                        .is_none_or(|system_id| grant.system_id == system_id)
                    && (!query.active_only || grant.status == GrantStatus::Active)
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.granted_at.cmp(&left.granted_at));
        Ok(matching)
    }
}
