use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use accesstrack_application::{GrantQuery, GrantRepository, NewGrant};
use accesstrack_core::{AppError, AppResult};
use accesstrack_domain::{
    AccessGrant, GrantId, GrantKey, GrantStatus, InstanceId, SystemId, TierId, UserId,
};

const ACTIVE_UNIQUE_INDEX: &str = "access_grants_active_unique";

/// PostgreSQL-backed grant storage.
///
/// The partial unique index on the active-grant tuple backs up the
/// application-level duplicate check: a concurrent insert landing
/// between validation and commit fails the transaction instead of
/// creating a duplicate.
#[derive(Clone)]
pub struct PostgresGrantRepository {
    pool: PgPool,
}

impl PostgresGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GrantKeyRow {
    user_id: uuid::Uuid,
    system_id: uuid::Uuid,
    tier_id: uuid::Uuid,
    instance_id: Option<uuid::Uuid>,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    system_id: uuid::Uuid,
    tier_id: uuid::Uuid,
    instance_id: Option<uuid::Uuid>,
    status: String,
    granted_by: uuid::Uuid,
    granted_at: DateTime<Utc>,
    removed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl From<GrantKeyRow> for GrantKey {
    fn from(row: GrantKeyRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            system_id: SystemId::from_uuid(row.system_id),
            tier_id: TierId::from_uuid(row.tier_id),
            instance_id: row.instance_id.map(InstanceId::from_uuid),
        }
    }
}

impl TryFrom<GrantRow> for AccessGrant {
    type Error = AppError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: GrantId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            system_id: SystemId::from_uuid(row.system_id),
            tier_id: TierId::from_uuid(row.tier_id),
            instance_id: row.instance_id.map(InstanceId::from_uuid),
            status: GrantStatus::from_str(row.status.as_str())?,
            granted_by: row.granted_by,
            granted_at: row.granted_at,
            removed_at: row.removed_at,
            notes: row.notes,
        })
    }
}

fn map_insert_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.constraint() == Some(ACTIVE_UNIQUE_INDEX) {
            return AppError::Conflict(
                "an active grant already exists for this user, system, tier, and instance scope"
                    .to_owned(),
            );
        }
    }

    AppError::Internal(format!("failed to insert grant: {error}"))
}

#[async_trait]
impl GrantRepository for PostgresGrantRepository {
    async fn list_active_grant_keys(&self) -> AppResult<Vec<GrantKey>> {
        let rows = sqlx::query_as::<_, GrantKeyRow>(
            r#"
            SELECT user_id, system_id, tier_id, instance_id
            FROM access_grants
            WHERE status = 'active'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list active grant keys: {error}"))
        })?;

        Ok(rows.into_iter().map(GrantKey::from).collect())
    }

    async fn count_active_for_key(&self, key: &GrantKey) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM access_grants
            WHERE status = 'active'
              AND user_id = $1
              AND system_id = $2
              AND tier_id = $3
              AND instance_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(key.user_id.as_uuid())
        .bind(key.system_id.as_uuid())
        .bind(key.tier_id.as_uuid())
        .bind(key.instance_id.map(|instance_id| instance_id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count active grants: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn insert_grants_atomically(&self, grants: Vec<NewGrant>) -> AppResult<u64> {
        if grants.is_empty() {
            return Ok(0);
        }

        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let inserted = grants.len() as u64;
        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO access_grants
                    (id, user_id, system_id, tier_id, instance_id,
                     status, granted_by, granted_at, notes)
                VALUES ($1, $2, $3, $4, $5, 'active', $6, $7, $8)
                "#,
            )
            .bind(grant.id.as_uuid())
            .bind(grant.user_id.as_uuid())
            .bind(grant.system_id.as_uuid())
            .bind(grant.tier_id.as_uuid())
            .bind(grant.instance_id.map(|instance_id| instance_id.as_uuid()))
            .bind(grant.granted_by)
            .bind(grant.granted_at)
            .bind(grant.notes)
            .execute(&mut *transaction)
            .await
            .map_err(map_insert_error)?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit batch: {error}")))?;

        debug!(inserted, "committed grant batch");
        Ok(inserted)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, user_id, system_id, tier_id, instance_id,
                   status, granted_by, granted_at, removed_at, notes
            FROM access_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find grant: {error}")))?;

        row.map(AccessGrant::try_from).transpose()
    }

    async fn mark_removed(
        &self,
        grant_id: GrantId,
        removed_at: DateTime<Utc>,
    ) -> AppResult<AccessGrant> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            UPDATE access_grants
            SET status = 'removed', removed_at = $2
            WHERE id = $1 AND status = 'active'
            RETURNING id, user_id, system_id, tier_id, instance_id,
                      status, granted_by, granted_at, removed_at, notes
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(removed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to mark grant removed: {error}")))?;

        match row {
            Some(row) => AccessGrant::try_from(row),
            None => match self.find_grant(grant_id).await? {
                Some(_) => Err(AppError::Conflict(format!(
                    "grant '{grant_id}' is already removed"
                ))),
                None => Err(AppError::NotFound(format!("grant '{grant_id}'"))),
            },
        }
    }

    async fn list_grants(&self, query: GrantQuery) -> AppResult<Vec<AccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, user_id, system_id, tier_id, instance_id,
                   status, granted_by, granted_at, removed_at, notes
            FROM access_grants
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR system_id = $2)
              AND (NOT $3 OR status = 'active')
            ORDER BY granted_at DESC, id
            "#,
        )
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.system_id.map(|system_id| system_id.as_uuid()))
        .bind(query.active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list grants: {error}")))?;

        rows.into_iter().map(AccessGrant::try_from).collect()
    }
}
