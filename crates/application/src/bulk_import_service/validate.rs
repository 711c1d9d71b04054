//! Per-row grant validation.
//!
//! Every applicable rule is checked independently and every failing
//! check contributes its own message; a row is never partially valid
//! and never short-circuits the rest of the batch.

use std::collections::{HashMap, HashSet};

use accesstrack_domain::GrantKey;

use super::csv::{NumberedRow, RowError};
use super::resolve::ResolvedRefs;
use super::{ErrorRow, RowInput, ValidRow};

/// Final disposition of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RowOutcome {
    /// Row passed every check.
    Valid(ValidRow),
    /// Row violated at least one rule.
    Error(ErrorRow),
}

/// Accumulated assessment of one row, pending batch-wide duplicate
/// flagging.
#[derive(Debug, Clone)]
pub(super) struct RowDraft {
    row_number: usize,
    input: RowInput,
    errors: Vec<String>,
    key: Option<GrantKey>,
}

impl RowDraft {
    /// Returns the resolved uniqueness tuple, when the row resolved
    /// cleanly enough to have one.
    pub(super) fn key(&self) -> Option<GrantKey> {
        self.key
    }

    /// Row position for duplicate cross-references.
    pub(super) fn row_number(&self) -> usize {
        self.row_number
    }

    /// Appends a batch-level duplicate finding.
    pub(super) fn push_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Seals the draft into its final disposition.
    pub(super) fn into_outcome(self) -> RowOutcome {
        match (self.key, self.errors.is_empty()) {
            (Some(key), true) => RowOutcome::Valid(ValidRow {
                row_number: self.row_number,
                row: self.input,
                user_id: key.user_id,
                system_id: key.system_id,
                tier_id: key.tier_id,
                instance_id: key.instance_id,
            }),
            (_, _) => {
                let errors = if self.errors.is_empty() {
                    vec!["row did not fully resolve".to_owned()]
                } else {
                    self.errors
                };

                RowOutcome::Error(ErrorRow {
                    row_number: self.row_number,
                    row: self.input,
                    errors,
                })
            }
        }
    }
}

/// Assesses one row against every rule except intra-batch duplication.
///
/// Ordering of accumulated messages: missing required fields, unresolved
/// references, ownership mismatches, then duplication against existing
/// active grants.
pub(super) fn assess_row(
    row: NumberedRow,
    refs: ResolvedRefs,
    existing_active: &HashSet<GrantKey>,
) -> RowDraft {
    let mut errors = missing_field_errors(&row.input);
    errors.extend(refs.unresolved);

    if let (Some(system), Some(tier)) = (&refs.system, &refs.tier) {
        if !tier.belongs_to(system.id) {
            errors.push(format!(
                "tier '{}' does not belong to system '{}'",
                tier.name, system.name
            ));
        }
    }

    if let (Some(system), Some(instance)) = (&refs.system, &refs.instance) {
        if !instance.belongs_to(system.id) {
            errors.push(format!(
                "instance '{}' does not belong to system '{}'",
                instance.name, system.name
            ));
        }
    }

    let instance_resolved = !refs.instance_requested || refs.instance.is_some();
    let key = match (&refs.user, &refs.system, &refs.tier) {
        (Some(user), Some(system), Some(tier)) if errors.is_empty() && instance_resolved => {
            Some(GrantKey {
                user_id: user.id,
                system_id: system.id,
                tier_id: tier.id,
                instance_id: refs.instance.as_ref().map(|instance| instance.id),
            })
        }
        _ => None,
    };

    if let Some(key) = &key {
        if existing_active.contains(key) {
            errors.push(
                "user already holds an active grant for this system, tier, and instance scope"
                    .to_owned(),
            );
        }
    }

    RowDraft {
        row_number: row.row_number,
        input: row.input,
        errors,
        key,
    }
}

/// Flags rows whose resolved tuples collide within the same batch.
///
/// Every row in a colliding group is an error and each message names
/// the other rows of the group, so the uploader sees both sides.
pub(super) fn flag_batch_duplicates(drafts: &mut [RowDraft]) {
    let mut by_key: HashMap<GrantKey, Vec<usize>> = HashMap::new();
    for (index, draft) in drafts.iter().enumerate() {
        if let Some(key) = draft.key() {
            by_key.entry(key).or_default().push(index);
        }
    }

    for indices in by_key.values() {
        if indices.len() < 2 {
            continue;
        }

        let row_numbers: Vec<usize> = indices
            .iter()
            .map(|&index| drafts[index].row_number())
            .collect();

        for &index in indices {
            let own_number = drafts[index].row_number();
            let others: Vec<String> = row_numbers
                .iter()
                .filter(|&&number| number != own_number)
                .map(usize::to_string)
                .collect();

            drafts[index].push_error(format!(
                "resolves to the same grant as row(s) {} of this upload",
                others.join(", ")
            ));
        }
    }
}

/// Converts a row-local structural parse defect into an error row,
/// keeping whatever fields the row did supply.
pub(super) fn structural_error_row(error: RowError) -> ErrorRow {
    ErrorRow {
        row_number: error.row_number,
        row: error.input,
        errors: vec![error.message],
    }
}

/// Reports required textual inputs that are empty after trim.
///
/// Emptiness is distinct from "unknown reference": an empty field is
/// never sent to the resolver.
pub(super) fn missing_field_errors(input: &RowInput) -> Vec<String> {
    let mut errors = Vec::new();

    if input.user_email.trim().is_empty() {
        errors.push("missing required field 'user_email'".to_owned());
    }
    if input.system_name.trim().is_empty() {
        errors.push("missing required field 'system_name'".to_owned());
    }
    if input.access_tier_name.trim().is_empty() {
        errors.push("missing required field 'access_tier_name'".to_owned());
    }

    errors
}
