//! Access grants and their lifecycle invariants.

use std::str::FromStr;

use accesstrack_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{InstanceId, SystemId, TierId};
use crate::user::UserId;

/// Unique identifier for an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle state of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// The grant is in force.
    Active,
    /// The grant has been revoked; terminal state.
    Removed,
}

impl GrantStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
        }
    }
}

impl FromStr for GrantStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "removed" => Ok(Self::Removed),
            _ => Err(AppError::Validation(format!(
                "unknown grant status value '{value}'"
            ))),
        }
    }
}

/// The uniqueness tuple for active grants.
///
/// `instance_id = None` scopes the grant to all instances of the system
/// and is a distinct key value: a blanket grant and an instance-specific
/// grant of the same tier do not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    /// Granted user.
    pub user_id: UserId,
    /// Granted system.
    pub system_id: SystemId,
    /// Granted tier.
    pub tier_id: TierId,
    /// Instance scope; `None` means all instances.
    pub instance_id: Option<InstanceId>,
}

/// A record that a user holds an access tier on a system.
///
/// Grants are append-only: removal marks the record `Removed` and sets
/// `removed_at`, it never deletes the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// Granted user.
    pub user_id: UserId,
    /// Granted system.
    pub system_id: SystemId,
    /// Granted tier; must belong to `system_id`.
    pub tier_id: TierId,
    /// Instance scope; `None` means all instances, otherwise must belong
    /// to `system_id`.
    pub instance_id: Option<InstanceId>,
    /// Lifecycle state.
    pub status: GrantStatus,
    /// Actor who created the grant.
    pub granted_by: Uuid,
    /// Creation timestamp.
    pub granted_at: DateTime<Utc>,
    /// Removal timestamp; set exactly when status becomes `Removed`.
    pub removed_at: Option<DateTime<Utc>>,
    /// Optional free-text note.
    pub notes: Option<String>,
}

impl AccessGrant {
    /// Returns the uniqueness tuple for this grant.
    #[must_use]
    pub fn key(&self) -> GrantKey {
        GrantKey {
            user_id: self.user_id,
            system_id: self.system_id,
            tier_id: self.tier_id,
            instance_id: self.instance_id,
        }
    }

    /// Transitions the grant to `Removed`.
    ///
    /// `Removed` is terminal; removing an already-removed grant is a
    /// conflict.
    pub fn mark_removed(&mut self, removed_at: DateTime<Utc>) -> AppResult<()> {
        if self.status == GrantStatus::Removed {
            return Err(AppError::Conflict(format!(
                "grant '{}' is already removed",
                self.id
            )));
        }

        self.status = GrantStatus::Removed;
        self.removed_at = Some(removed_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::catalog::{InstanceId, SystemId, TierId};
    use crate::user::UserId;

    use super::{AccessGrant, GrantId, GrantKey, GrantStatus};

    fn sample_grant() -> AccessGrant {
        AccessGrant {
            id: GrantId::new(),
            user_id: UserId::new(),
            system_id: SystemId::new(),
            tier_id: TierId::new(),
            instance_id: None,
            status: GrantStatus::Active,
            granted_by: Uuid::new_v4(),
            granted_at: Utc::now(),
            removed_at: None,
            notes: None,
        }
    }

    #[test]
    fn status_roundtrip_storage_value() {
        let status = GrantStatus::Removed;
        let restored = GrantStatus::from_str(status.as_str());
        assert!(restored.is_ok());
        assert_eq!(restored.unwrap_or(GrantStatus::Active), status);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(GrantStatus::from_str("pending").is_err());
    }

    #[test]
    fn removal_sets_timestamp_once() {
        let mut grant = sample_grant();
        let removed_at = Utc::now();

        assert!(grant.mark_removed(removed_at).is_ok());
        assert_eq!(grant.status, GrantStatus::Removed);
        assert_eq!(grant.removed_at, Some(removed_at));
    }

    #[test]
    fn removed_is_terminal() {
        let mut grant = sample_grant();
        assert!(grant.mark_removed(Utc::now()).is_ok());
        assert!(grant.mark_removed(Utc::now()).is_err());
    }

    #[test]
    fn blanket_and_instance_keys_are_distinct() {
        let grant = sample_grant();
        let blanket = grant.key();
        let scoped = GrantKey {
            instance_id: Some(InstanceId::new()),
            ..blanket
        };

        assert_ne!(blanket, scoped);
    }
}
