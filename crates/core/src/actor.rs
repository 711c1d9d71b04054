use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the authenticated caller performing a write.
///
/// Authentication happens upstream of this service; handlers receive the
/// already-resolved actor and thread it into every mutation so grants carry
/// a `granted_by` audit value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    subject: Uuid,
    display_name: Option<String>,
}

impl ActorIdentity {
    /// Creates an actor identity from upstream authentication data.
    #[must_use]
    pub fn new(subject: Uuid, display_name: Option<String>) -> Self {
        Self {
            subject,
            display_name,
        }
    }

    /// Returns the stable subject identifier for the actor.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }

    /// Returns the display name, if the upstream gateway supplied one.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}
