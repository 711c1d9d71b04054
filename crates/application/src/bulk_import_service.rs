//! Batch ingestion of access grants from CSV or structured rows.
//!
//! Two-phase flow: validation always evaluates the whole batch and
//! returns a row-by-row partition; commit is a separate explicit step
//! that refuses to run while any error rows remain, then inserts every
//! valid row in one transaction. Partial success is never an outcome.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use accesstrack_core::{ActorIdentity, AppError, AppResult};
use accesstrack_domain::{GrantId, GrantKey, InstanceId, SystemId, TierId, UserId};

use crate::grant_ports::{DirectoryRepository, GrantRepository, NewGrant};

mod csv;
mod resolve;
mod template;
mod validate;

#[cfg(test)]
mod tests;

pub use template::csv_template;

/// One logical input row for batch ingestion.
///
/// Both ingestion paths produce this shape: the CSV parser fills it
/// from recognized header columns, the structured path deserializes an
/// array of objects. A missing field and an empty field are equivalent;
/// emptiness is reported by the validator, never by deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowInput {
    /// Email of the user receiving access.
    #[serde(default)]
    pub user_email: String,
    /// Name of the target system.
    #[serde(default)]
    pub system_name: String,
    /// Optional instance scope; empty means all instances.
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Name of the tier within the target system.
    #[serde(default)]
    pub access_tier_name: String,
    /// Optional free-text note.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A row that passed every check, carrying its resolved identifiers
/// alongside the original text for audit and preview display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRow {
    /// 1-indexed physical line in the upload; the header line counts.
    pub row_number: usize,
    /// Original row text as entered.
    pub row: RowInput,
    /// Resolved user.
    pub user_id: UserId,
    /// Resolved system.
    pub system_id: SystemId,
    /// Resolved tier.
    pub tier_id: TierId,
    /// Resolved instance scope; `None` means all instances.
    pub instance_id: Option<InstanceId>,
}

/// A row that failed one or more checks, with every violated rule
/// listed in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRow {
    /// 1-indexed physical line in the upload; the header line counts.
    pub row_number: usize,
    /// Original row text as entered.
    pub row: RowInput,
    /// All violated rules for this row.
    pub errors: Vec<String>,
}

/// Full validity partition of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkValidationReport {
    /// Batch-level structural errors; non-empty means zero rows were
    /// produced and the batch can never be committed.
    pub batch_errors: Vec<String>,
    /// Non-blocking notices such as unknown columns.
    pub warnings: Vec<String>,
    /// Rows that passed every check, in input order.
    pub valid_rows: Vec<ValidRow>,
    /// Rows that failed at least one check, in input order.
    pub error_rows: Vec<ErrorRow>,
}

impl BulkValidationReport {
    /// Returns true when the batch cannot be committed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.batch_errors.is_empty() || !self.error_rows.is_empty()
    }
}

/// Coordinates parsing, resolution, validation, and the atomic commit
/// of batch grant uploads.
#[derive(Clone)]
pub struct BulkImportService {
    directory: Arc<dyn DirectoryRepository>,
    grants: Arc<dyn GrantRepository>,
}

impl BulkImportService {
    /// Creates the service over its repository ports.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryRepository>, grants: Arc<dyn GrantRepository>) -> Self {
        Self { directory, grants }
    }

    /// Validates a raw CSV payload and returns the full partition.
    ///
    /// Never fails on row content; only a storage failure during
    /// lookups aborts the batch.
    pub async fn validate_csv(&self, raw_text: &str) -> AppResult<BulkValidationReport> {
        let outcome = csv::parse(raw_text);

        if !outcome.batch_errors.is_empty() {
            // Missing required columns: global-fatal, nothing to assess.
            return Ok(BulkValidationReport {
                batch_errors: outcome.batch_errors,
                warnings: outcome.warnings,
                valid_rows: Vec::new(),
                error_rows: Vec::new(),
            });
        }

        let mut report = self.assess(outcome.rows).await?;
        report.warnings = outcome.warnings;

        // Row-local structural errors (field-count mismatches) join the
        // affected rows in the error partition.
        for structural in outcome.row_errors {
            report
                .error_rows
                .push(validate::structural_error_row(structural));
        }
        report
            .error_rows
            .sort_by_key(|error_row| error_row.row_number);

        Ok(report)
    }

    /// Validates pre-structured rows and returns the full partition.
    ///
    /// Rows are numbered from 2 so both ingestion paths report the same
    /// number for the same logical row.
    pub async fn validate_rows(&self, rows: Vec<RowInput>) -> AppResult<BulkValidationReport> {
        let numbered = rows
            .into_iter()
            .enumerate()
            .map(|(index, input)| csv::NumberedRow {
                row_number: index + 2,
                input,
            })
            .collect();

        self.assess(numbered).await
    }

    /// Commits a clean validation report in one atomic transaction.
    ///
    /// Refused with a batch-level error while any error rows remain;
    /// the valid subset is never inserted on its own. An empty batch
    /// commits successfully with a count of zero.
    pub async fn commit(
        &self,
        actor: &ActorIdentity,
        report: BulkValidationReport,
    ) -> AppResult<u64> {
        if report.has_errors() {
            return Err(AppError::Validation(format!(
                "batch has {} error row(s) and {} batch error(s); nothing was inserted",
                report.error_rows.len(),
                report.batch_errors.len()
            )));
        }

        if report.valid_rows.is_empty() {
            return Ok(0);
        }

        let granted_at = Utc::now();
        let grants = report
            .valid_rows
            .into_iter()
            .map(|valid| NewGrant {
                id: GrantId::new(),
                user_id: valid.user_id,
                system_id: valid.system_id,
                tier_id: valid.tier_id,
                instance_id: valid.instance_id,
                granted_by: actor.subject(),
                granted_at,
                notes: valid
                    .row
                    .notes
                    .filter(|notes| !notes.trim().is_empty()),
            })
            .collect();

        self.grants.insert_grants_atomically(grants).await
    }

    /// Resolves and validates every row, then flags intra-batch
    /// duplicates across the whole set before partitioning.
    async fn assess(&self, rows: Vec<csv::NumberedRow>) -> AppResult<BulkValidationReport> {
        let existing: HashSet<GrantKey> = self
            .grants
            .list_active_grant_keys()
            .await?
            .into_iter()
            .collect();

        let mut drafts = Vec::with_capacity(rows.len());
        for row in rows {
            let refs = resolve::resolve_row(self.directory.as_ref(), &row.input).await?;
            drafts.push(validate::assess_row(row, refs, &existing));
        }

        validate::flag_batch_duplicates(&mut drafts);

        let mut report = BulkValidationReport::default();
        for draft in drafts {
            match draft.into_outcome() {
                validate::RowOutcome::Valid(valid) => report.valid_rows.push(valid),
                validate::RowOutcome::Error(error) => report.error_rows.push(error),
            }
        }

        Ok(report)
    }
}
