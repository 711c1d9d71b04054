//! Systems and the instances and access tiers scoped under them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tracked system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemId(Uuid);

impl SystemId {
    /// Creates a new random system identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a system identifier from an existing UUID value.
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

impl Default for SystemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a system instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random instance identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an instance identifier from an existing UUID value.
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

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for an access tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierId(Uuid);

impl TierId {
    /// Creates a new random tier identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tier identifier from an existing UUID value.
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

impl Default for TierId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TierId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A system users can be granted access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    /// Stable system identifier.
    pub id: SystemId,
    /// Unique system name; case-insensitive resolution key.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// A named deployment or environment of one system.
///
/// Instance names are unique per system, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Stable instance identifier.
    pub id: InstanceId,
    /// Instance name; unique within the owning system.
    pub name: String,
    /// Owning system.
    pub system_id: SystemId,
}

/// A named permission level defined within one system.
///
/// Tier names are unique per system, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTier {
    /// Stable tier identifier.
    pub id: TierId,
    /// Tier name; unique within the owning system.
    pub name: String,
    /// Owning system.
    pub system_id: SystemId,
}

impl Instance {
    /// Returns true when this instance is owned by the given system.
    #[must_use]
    pub fn belongs_to(&self, system_id: SystemId) -> bool {
        self.system_id == system_id
    }
}

impl AccessTier {
    /// Returns true when this tier is owned by the given system.
    #[must_use]
    pub fn belongs_to(&self, system_id: SystemId) -> bool {
        self.system_id == system_id
    }
}
