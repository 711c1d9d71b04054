//! Application services and ports for access-grant tracking.

#![forbid(unsafe_code)]

mod bulk_import_service;
mod grant_ports;
mod grant_service;

pub use bulk_import_service::{
    BulkImportService, BulkValidationReport, ErrorRow, RowInput, ValidRow, csv_template,
};
pub use grant_ports::{DirectoryRepository, GrantQuery, GrantRepository, NewGrant};
pub use grant_service::{CreateGrantInput, GrantService};
