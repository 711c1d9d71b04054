//! Reference resolution for batch rows.
//!
//! Maps textual identifiers to directory records. Pure lookup: a value
//! that fails to resolve is recorded for the validator to report, never
//! raised. Tier and instance lookups are scoped to the resolved system
//! so a same-named tier under a different system is never matched.

use accesstrack_core::AppResult;
use accesstrack_domain::{AccessTier, Instance, System, User};

use super::RowInput;
use crate::grant_ports::DirectoryRepository;

/// Resolution result for one row.
///
/// Empty fields are skipped entirely; their absence is the validator's
/// concern. An absent instance value is not a failure: it deterministically
/// means "applies to all instances".
#[derive(Debug, Clone, Default)]
pub(super) struct ResolvedRefs {
    /// Resolved user, when the email matched.
    pub user: Option<User>,
    /// Resolved system, when the name matched.
    pub system: Option<System>,
    /// Resolved tier, when the system resolved and the name matched in
    /// its scope.
    pub tier: Option<AccessTier>,
    /// Resolved instance, under the same scoping rule.
    pub instance: Option<Instance>,
    /// Whether the row supplied a non-empty instance value.
    pub instance_requested: bool,
    /// Human-readable labels for every value that failed to resolve.
    pub unresolved: Vec<String>,
}

/// Resolves every non-empty reference in one row.
pub(super) async fn resolve_row(
    directory: &dyn DirectoryRepository,
    input: &RowInput,
) -> AppResult<ResolvedRefs> {
    let mut refs = ResolvedRefs::default();

    let email = input.user_email.trim();
    if !email.is_empty() {
        refs.user = directory.find_user_by_email(email).await?;
        if refs.user.is_none() {
            refs.unresolved.push(format!("unknown user_email '{email}'"));
        }
    }

    let system_name = input.system_name.trim();
    if !system_name.is_empty() {
        refs.system = directory.find_system_by_name(system_name).await?;
        if refs.system.is_none() {
            refs.unresolved
                .push(format!("unknown system_name '{system_name}'"));
        }
    }

    let tier_name = input.access_tier_name.trim();
    if !tier_name.is_empty() {
        if let Some(system) = &refs.system {
            refs.tier = directory.find_tier_by_name(system.id, tier_name).await?;
            if refs.tier.is_none() {
                refs.unresolved.push(format!(
                    "unknown access_tier_name '{tier_name}' for system '{}'",
                    system.name
                ));
            }
        }
    }

    let instance_name = input
        .instance_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    refs.instance_requested = !instance_name.is_empty();
    if refs.instance_requested {
        if let Some(system) = &refs.system {
            refs.instance = directory
                .find_instance_by_name(system.id, instance_name)
                .await?;
            if refs.instance.is_none() {
                refs.unresolved.push(format!(
                    "unknown instance_name '{instance_name}' for system '{}'",
                    system.name
                ));
            }
        }
    }

    Ok(refs)
}
