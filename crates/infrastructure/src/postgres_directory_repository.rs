use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use accesstrack_application::DirectoryRepository;
use accesstrack_core::{AppError, AppResult};
use accesstrack_domain::{
    AccessTier, EmailAddress, Instance, InstanceId, System, SystemId, TierId, User, UserId,
};

/// PostgreSQL-backed directory lookups.
///
/// Name matches are exact after case folding, which mirrors the unique
/// functional indexes on the underlying tables.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    display_name: String,
    email: String,
}

#[derive(Debug, FromRow)]
struct SystemRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
}

#[derive(Debug, FromRow)]
struct TierRow {
    id: uuid::Uuid,
    system_id: uuid::Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct InstanceRow {
    id: uuid::Uuid,
    system_id: uuid::Uuid,
    name: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(row.email)
            .map_err(|error| AppError::Internal(format!("stored email is invalid: {error}")))?;

        Ok(Self {
            id: UserId::from_uuid(row.id),
            display_name: row.display_name,
            email,
        })
    }
}

impl From<SystemRow> for System {
    fn from(row: SystemRow) -> Self {
        Self {
            id: SystemId::from_uuid(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

impl From<TierRow> for AccessTier {
    fn from(row: TierRow) -> Self {
        Self {
            id: TierId::from_uuid(row.id),
            name: row.name,
            system_id: SystemId::from_uuid(row.system_id),
        }
    }
}

impl From<InstanceRow> for Instance {
    fn from(row: InstanceRow) -> Self {
        Self {
            id: InstanceId::from_uuid(row.id),
            name: row.name,
            system_id: SystemId::from_uuid(row.system_id),
        }
    }
}

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by email: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_system_by_name(&self, name: &str) -> AppResult<Option<System>> {
        let row = sqlx::query_as::<_, SystemRow>(
            r#"
            SELECT id, name, description
            FROM systems
            WHERE LOWER(name) = LOWER($1)
            "#,
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find system by name: {error}")))?;

        Ok(row.map(System::from))
    }

    async fn find_tier_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<AccessTier>> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, system_id, name
            FROM access_tiers
            WHERE system_id = $1 AND LOWER(name) = LOWER($2)
            "#,
        )
        .bind(system_id.as_uuid())
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find tier by name: {error}")))?;

        Ok(row.map(AccessTier::from))
    }

    async fn find_instance_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<Instance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, system_id, name
            FROM system_instances
            WHERE system_id = $1 AND LOWER(name) = LOWER($2)
            "#,
        )
        .bind(system_id.as_uuid())
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find instance by name: {error}")))?;

        Ok(row.map(Instance::from))
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_system(&self, system_id: SystemId) -> AppResult<Option<System>> {
        let row = sqlx::query_as::<_, SystemRow>(
            r#"
            SELECT id, name, description
            FROM systems
            WHERE id = $1
            "#,
        )
        .bind(system_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find system: {error}")))?;

        Ok(row.map(System::from))
    }

    async fn find_tier(&self, tier_id: TierId) -> AppResult<Option<AccessTier>> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, system_id, name
            FROM access_tiers
            WHERE id = $1
            "#,
        )
        .bind(tier_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find tier: {error}")))?;

        Ok(row.map(AccessTier::from))
    }

    async fn find_instance(&self, instance_id: InstanceId) -> AppResult<Option<Instance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, system_id, name
            FROM system_instances
            WHERE id = $1
            "#,
        )
        .bind(instance_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find instance: {error}")))?;

        Ok(row.map(Instance::from))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name, email
            FROM users
            ORDER BY LOWER(email)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn list_systems(&self) -> AppResult<Vec<System>> {
        let rows = sqlx::query_as::<_, SystemRow>(
            r#"
            SELECT id, name, description
            FROM systems
            ORDER BY LOWER(name)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list systems: {error}")))?;

        Ok(rows.into_iter().map(System::from).collect())
    }

    async fn list_tiers(&self, system_id: SystemId) -> AppResult<Vec<AccessTier>> {
        let rows = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, system_id, name
            FROM access_tiers
            WHERE system_id = $1
            ORDER BY LOWER(name)
            "#,
        )
        .bind(system_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tiers: {error}")))?;

        Ok(rows.into_iter().map(AccessTier::from).collect())
    }

    async fn list_instances(&self, system_id: SystemId) -> AppResult<Vec<Instance>> {
        let rows = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, system_id, name
            FROM system_instances
            WHERE system_id = $1
            ORDER BY LOWER(name)
            "#,
        )
        .bind(system_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list instances: {error}")))?;

        Ok(rows.into_iter().map(Instance::from).collect())
    }
}
