//! Transport payloads and their conversions from application types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use accesstrack_application::{BulkValidationReport, ErrorRow, RowInput, ValidRow};
use accesstrack_domain::{AccessGrant, AccessTier, Instance, System, User};

/// Incoming payload for direct grant creation.
#[derive(Debug, Deserialize)]
pub struct CreateGrantRequest {
    pub user_id: Uuid,
    pub system_id: Uuid,
    pub tier_id: Uuid,
    pub instance_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Incoming payload for batch validation and commit.
///
/// Exactly one of `csv` and `rows` must be present.
#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    pub csv: Option<String>,
    pub rows: Option<Vec<RowInput>>,
}

/// Filters accepted by the grant listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct GrantListParams {
    pub user_id: Option<Uuid>,
    pub system_id: Option<Uuid>,
    #[serde(default)]
    pub active_only: bool,
}

/// API representation of an access grant.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub system_id: Uuid,
    pub tier_id: Uuid,
    pub instance_id: Option<Uuid>,
    pub status: String,
    pub granted_by: Uuid,
    pub granted_at: String,
    pub removed_at: Option<String>,
    pub notes: Option<String>,
}

impl From<AccessGrant> for GrantResponse {
    fn from(grant: AccessGrant) -> Self {
        Self {
            id: grant.id.as_uuid(),
            user_id: grant.user_id.as_uuid(),
            system_id: grant.system_id.as_uuid(),
            tier_id: grant.tier_id.as_uuid(),
            instance_id: grant.instance_id.map(|instance_id| instance_id.as_uuid()),
            status: grant.status.as_str().to_owned(),
            granted_by: grant.granted_by,
            granted_at: grant.granted_at.to_rfc3339(),
            removed_at: grant.removed_at.map(|removed_at| removed_at.to_rfc3339()),
            notes: grant.notes,
        }
    }
}

/// API representation of a row that passed validation.
#[derive(Debug, Serialize)]
pub struct ValidRowResponse {
    pub row_number: usize,
    pub row: RowInput,
    pub user_id: Uuid,
    pub system_id: Uuid,
    pub tier_id: Uuid,
    pub instance_id: Option<Uuid>,
}

impl From<ValidRow> for ValidRowResponse {
    fn from(valid: ValidRow) -> Self {
        Self {
            row_number: valid.row_number,
            row: valid.row,
            user_id: valid.user_id.as_uuid(),
            system_id: valid.system_id.as_uuid(),
            tier_id: valid.tier_id.as_uuid(),
            instance_id: valid.instance_id.map(|instance_id| instance_id.as_uuid()),
        }
    }
}

/// API representation of a row that failed validation.
#[derive(Debug, Serialize)]
pub struct ErrorRowResponse {
    pub row_number: usize,
    pub row: RowInput,
    pub errors: Vec<String>,
}

impl From<ErrorRow> for ErrorRowResponse {
    fn from(error: ErrorRow) -> Self {
        Self {
            row_number: error.row_number,
            row: error.row,
            errors: error.errors,
        }
    }
}

/// API representation of a full batch validity partition.
#[derive(Debug, Serialize)]
pub struct BulkValidationResponse {
    pub batch_errors: Vec<String>,
    pub warnings: Vec<String>,
    pub valid_rows: Vec<ValidRowResponse>,
    pub error_rows: Vec<ErrorRowResponse>,
}

impl From<BulkValidationReport> for BulkValidationResponse {
    fn from(report: BulkValidationReport) -> Self {
        Self {
            batch_errors: report.batch_errors,
            warnings: report.warnings,
            valid_rows: report
                .valid_rows
                .into_iter()
                .map(ValidRowResponse::from)
                .collect(),
            error_rows: report
                .error_rows
                .into_iter()
                .map(ErrorRowResponse::from)
                .collect(),
        }
    }
}

/// API response for a committed batch.
#[derive(Debug, Serialize)]
pub struct BulkCommitResponse {
    pub inserted_count: u64,
}

/// API representation of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.as_uuid(),
            display_name: user.display_name,
            email: user.email.into(),
        }
    }
}

/// API representation of a system.
#[derive(Debug, Serialize)]
pub struct SystemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<System> for SystemResponse {
    fn from(system: System) -> Self {
        Self {
            id: system.id.as_uuid(),
            name: system.name,
            description: system.description,
        }
    }
}

/// API representation of an access tier.
#[derive(Debug, Serialize)]
pub struct TierResponse {
    pub id: Uuid,
    pub name: String,
    pub system_id: Uuid,
}

impl From<AccessTier> for TierResponse {
    fn from(tier: AccessTier) -> Self {
        Self {
            id: tier.id.as_uuid(),
            name: tier.name,
            system_id: tier.system_id.as_uuid(),
        }
    }
}

/// API representation of a system instance.
#[derive(Debug, Serialize)]
pub struct InstanceResponse {
    pub id: Uuid,
    pub name: String,
    pub system_id: Uuid,
}

impl From<Instance> for InstanceResponse {
    fn from(instance: Instance) -> Self {
        Self {
            id: instance.id.as_uuid(),
            name: instance.name,
            system_id: instance.system_id.as_uuid(),
        }
    }
}
