use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use accesstrack_application::DirectoryRepository;
use accesstrack_core::{AppError, AppResult};
use accesstrack_domain::{AccessTier, Instance, InstanceId, System, SystemId, TierId, User, UserId};

/// In-memory directory implementation for tests and local development.
///
/// Enforces the same uniqueness rules as the PostgreSQL schema: email
/// unique case-insensitively, system names unique globally, tier and
/// instance names unique per system.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryRepository {
    users: RwLock<HashMap<UserId, User>>,
    systems: RwLock<HashMap<SystemId, System>>,
    tiers: RwLock<HashMap<TierId, AccessTier>>,
    instances: RwLock<HashMap<InstanceId, Instance>>,
}

impl InMemoryDirectoryRepository {
    /// Creates an empty in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    pub async fn add_user(&self, user: User) -> AppResult<()> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|existing| existing.email.as_str() == user.email.as_str())
        {
            return Err(AppError::Conflict(format!(
                "user with email '{}' already exists",
                user.email.as_str()
            )));
        }

        users.insert(user.id, user);
        Ok(())
    }

    /// Adds a system.
    pub async fn add_system(&self, system: System) -> AppResult<()> {
        let mut systems = self.systems.write().await;

        if systems
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(system.name.as_str()))
        {
            return Err(AppError::Conflict(format!(
                "system '{}' already exists",
                system.name
            )));
        }

        systems.insert(system.id, system);
        Ok(())
    }

    /// Adds an access tier under its system.
    pub async fn add_tier(&self, tier: AccessTier) -> AppResult<()> {
        let mut tiers = self.tiers.write().await;

        if tiers.values().any(|existing| {
            existing.system_id == tier.system_id
                && existing.name.eq_ignore_ascii_case(tier.name.as_str())
        }) {
            return Err(AppError::Conflict(format!(
                "tier '{}' already exists for this system",
                tier.name
            )));
        }

        tiers.insert(tier.id, tier);
        Ok(())
    }

    /// Adds an instance under its system.
    pub async fn add_instance(&self, instance: Instance) -> AppResult<()> {
        let mut instances = self.instances.write().await;

        if instances.values().any(|existing| {
            existing.system_id == instance.system_id
                && existing.name.eq_ignore_ascii_case(instance.name.as_str())
        }) {
            return Err(AppError::Conflict(format!(
                "instance '{}' already exists for this system",
                instance.name
            )));
        }

        instances.insert(instance.id, instance);
        Ok(())
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email.as_str() == needle)
            .cloned())
    }

    async fn find_system_by_name(&self, name: &str) -> AppResult<Option<System>> {
        let needle = name.trim();
        Ok(self
            .systems
            .read()
            .await
            .values()
            .find(|system| system.name.eq_ignore_ascii_case(needle))
            .cloned())
    }

    async fn find_tier_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<AccessTier>> {
        let needle = name.trim();
        Ok(self
            .tiers
            .read()
            .await
            .values()
            .find(|tier| tier.system_id == system_id && tier.name.eq_ignore_ascii_case(needle))
            .cloned())
    }

    async fn find_instance_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<Instance>> {
        let needle = name.trim();
        Ok(self
            .instances
            .read()
            .await
            .values()
            .find(|instance| {
                instance.system_id == system_id && instance.name.eq_ignore_ascii_case(needle)
            })
            .cloned())
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_system(&self, system_id: SystemId) -> AppResult<Option<System>> {
        Ok(self.systems.read().await.get(&system_id).cloned())
    }

    async fn find_tier(&self, tier_id: TierId) -> AppResult<Option<AccessTier>> {
        Ok(self.tiers.read().await.get(&tier_id).cloned())
    }

    async fn find_instance(&self, instance_id: InstanceId) -> AppResult<Option<Instance>> {
        Ok(self.instances.read().await.get(&instance_id).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|left, right| left.email.as_str().cmp(right.email.as_str()));
        Ok(users)
    }

    async fn list_systems(&self) -> AppResult<Vec<System>> {
        let mut systems: Vec<System> = self.systems.read().await.values().cloned().collect();
        systems.sort_by(|left, right| left.name.to_lowercase().cmp(&right.name.to_lowercase()));
        Ok(systems)
    }

    async fn list_tiers(&self, system_id: SystemId) -> AppResult<Vec<AccessTier>> {
        let mut tiers: Vec<AccessTier> = self
            .tiers
            .read()
            .await
            .values()
            .filter(|tier| tier.system_id == system_id)
            .cloned()
            .collect();
        tiers.sort_by(|left, right| left.name.to_lowercase().cmp(&right.name.to_lowercase()));
        Ok(tiers)
    }

    async fn list_instances(&self, system_id: SystemId) -> AppResult<Vec<Instance>> {
        let mut instances: Vec<Instance> = self
            .instances
            .read()
            .await
            .values()
            .filter(|instance| instance.system_id == system_id)
            .cloned()
            .collect();
        instances.sort_by(|left, right| left.name.to_lowercase().cmp(&right.name.to_lowercase()));
        Ok(instances)
    }
}
