//! Single-grant creation, removal, and listing.

use std::sync::Arc;

use chrono::Utc;

use accesstrack_core::{ActorIdentity, AppError, AppResult};
use accesstrack_domain::{
    AccessGrant, GrantId, GrantKey, GrantStatus, InstanceId, SystemId, TierId, UserId,
};

use crate::grant_ports::{DirectoryRepository, GrantQuery, GrantRepository, NewGrant};


/// Input payload for creating one grant through the direct path.
///
/// References arrive as identifiers (the UI resolves dropdown
/// selections before submitting), so the invariant checks here guard
/// against mismatched selections rather than unknown text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGrantInput {
    /// User receiving access.
    pub user_id: UserId,
    /// Target system.
    pub system_id: SystemId,
    /// Tier within the target system.
    pub tier_id: TierId,
    /// Optional instance scope; `None` means all instances.
    pub instance_id: Option<InstanceId>,
    /// Optional free-text note.
    pub notes: Option<String>,
}

/// Service for the direct (non-batch) grant path.
///
/// Applies the same invariants as batch validation but raises on the
/// first violation with a classified error, since there is no
/// multi-row report to build.
#[derive(Clone)]
pub struct GrantService {
    directory: Arc<dyn DirectoryRepository>,
    grants: Arc<dyn GrantRepository>,
}

impl GrantService {
    /// Creates the service over its repository ports.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryRepository>, grants: Arc<dyn GrantRepository>) -> Self {
        Self { directory, grants }
    }

    /// Creates one active grant.
    ///
    /// Fails with `NotFound` for unknown references, `Validation` for
    /// tier or instance ownership mismatches, and `Conflict` for a
    /// duplicate active grant.
    pub async fn create_grant(
        &self,
        actor: &ActorIdentity,
        input: CreateGrantInput,
    ) -> AppResult<AccessGrant> {
        let user = self
            .directory
            .find_user(input.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", input.user_id)))?;

        let system = self
            .directory
            .find_system(input.system_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("system '{}'", input.system_id)))?;

        let tier = self
            .directory
            .find_tier(input.tier_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("access tier '{}'", input.tier_id)))?;

        if !tier.belongs_to(system.id) {
            return Err(AppError::Validation(format!(
                "tier '{}' does not belong to system '{}'",
                tier.name, system.name
            )));
        }

        if let Some(instance_id) = input.instance_id {
            let instance = self
                .directory
                .find_instance(instance_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("instance '{instance_id}'")))?;

            if !instance.belongs_to(system.id) {
                return Err(AppError::Validation(format!(
                    "instance '{}' does not belong to system '{}'",
                    instance.name, system.name
                )));
            }
        }

        let key = GrantKey {
            user_id: user.id,
            system_id: system.id,
            tier_id: tier.id,
            instance_id: input.instance_id,
        };
        if self.grants.count_active_for_key(&key).await? > 0 {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds an active '{}' grant on '{}' for this instance scope",
                user.email.as_str(),
                tier.name,
                system.name
            )));
        }

        let grant = AccessGrant {
            id: GrantId::new(),
            user_id: key.user_id,
            system_id: key.system_id,
            tier_id: key.tier_id,
            instance_id: key.instance_id,
            status: GrantStatus::Active,
            granted_by: actor.subject(),
            granted_at: Utc::now(),
            removed_at: None,
            notes: input.notes.filter(|notes| !notes.trim().is_empty()),
        };

        self.grants
            .insert_grants_atomically(vec![NewGrant {
                id: grant.id,
                user_id: grant.user_id,
                system_id: grant.system_id,
                tier_id: grant.tier_id,
                instance_id: grant.instance_id,
                granted_by: grant.granted_by,
                granted_at: grant.granted_at,
                notes: grant.notes.clone(),
            }])
            .await?;

        Ok(grant)
    }

    /// Marks a grant removed.
    ///
    /// Removed is terminal: the record is kept for the audit trail and
    /// a second removal is a conflict.
    pub async fn remove_grant(
        &self,
        _actor: &ActorIdentity,
        grant_id: GrantId,
    ) -> AppResult<AccessGrant> {
        let grant = self
            .grants
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}'")))?;

        if grant.status == GrantStatus::Removed {
            return Err(AppError::Conflict(format!(
                "grant '{grant_id}' is already removed"
            )));
        }

        self.grants.mark_removed(grant_id, Utc::now()).await
    }

    /// Lists grants matching the query.
    pub async fn list_grants(&self, query: GrantQuery) -> AppResult<Vec<AccessGrant>> {
        self.grants.list_grants(query).await
    }
}
