use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use accesstrack_core::AppResult;
use accesstrack_domain::{
    AccessGrant, AccessTier, GrantId, GrantKey, Instance, InstanceId, System, SystemId, TierId,
    User, UserId,
};

/// A grant ready for insertion; always persisted with active status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    /// Identifier assigned by the caller before insertion.
    pub id: GrantId,
    /// Granted user.
    pub user_id: UserId,
    /// Granted system.
    pub system_id: SystemId,
    /// Granted tier.
    pub tier_id: TierId,
    /// Instance scope; `None` means all instances.
    pub instance_id: Option<InstanceId>,
    /// Actor who created the grant.
    pub granted_by: Uuid,
    /// Creation timestamp.
    pub granted_at: DateTime<Utc>,
    /// Optional free-text note.
    pub notes: Option<String>,
}

/// Filters for grant listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrantQuery {
    /// Restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one system.
    pub system_id: Option<SystemId>,
    /// When set, exclude removed grants.
    pub active_only: bool,
}

/// Repository port for resolving and listing directory entities.
///
/// Name lookups are exact matches after trimming, case-insensitive;
/// tier and instance lookups are scoped to one system so a same-named
/// tier under a different system is never matched.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Finds a user by email.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Finds a system by name.
    async fn find_system_by_name(&self, name: &str) -> AppResult<Option<System>>;

    /// Finds a tier by name within one system.
    async fn find_tier_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<AccessTier>>;

    /// Finds an instance by name within one system.
    async fn find_instance_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<Instance>>;

    /// Finds a user by identifier.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Finds a system by identifier.
    async fn find_system(&self, system_id: SystemId) -> AppResult<Option<System>>;

    /// Finds a tier by identifier.
    async fn find_tier(&self, tier_id: TierId) -> AppResult<Option<AccessTier>>;

    /// Finds an instance by identifier.
    async fn find_instance(&self, instance_id: InstanceId) -> AppResult<Option<Instance>>;

    /// Lists all users ordered by email.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Lists all systems ordered by name.
    async fn list_systems(&self) -> AppResult<Vec<System>>;

    /// Lists the tiers of one system ordered by name.
    async fn list_tiers(&self, system_id: SystemId) -> AppResult<Vec<AccessTier>>;

    /// Lists the instances of one system ordered by name.
    async fn list_instances(&self, system_id: SystemId) -> AppResult<Vec<Instance>>;
}

/// Repository port for reading and writing access grants.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Returns the uniqueness tuples of every active grant.
    async fn list_active_grant_keys(&self) -> AppResult<Vec<GrantKey>>;

    /// Counts active grants matching one uniqueness tuple.
    async fn count_active_for_key(&self, key: &GrantKey) -> AppResult<u64>;

    /// Inserts all grants in one transaction; all succeed or none are
    /// committed. The storage layer enforces the active-grant
    /// uniqueness tuple as the last line of defense against a write
    /// racing the validation read.
    async fn insert_grants_atomically(&self, grants: Vec<NewGrant>) -> AppResult<u64>;

    /// Finds a grant by identifier.
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>>;

    /// Marks an active grant removed and returns the updated record.
    ///
    /// Removed is terminal; marking an already-removed grant is a
    /// conflict.
    async fn mark_removed(
        &self,
        grant_id: GrantId,
        removed_at: DateTime<Utc>,
    ) -> AppResult<AccessGrant>;

    /// Lists grants matching the query, newest first.
    async fn list_grants(&self, query: GrantQuery) -> AppResult<Vec<AccessGrant>>;
}
