use std::sync::Arc;

use accesstrack_application::{BulkImportService, DirectoryRepository, GrantService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Two-phase batch ingestion service.
    pub bulk_import_service: BulkImportService,
    /// Direct grant creation and removal service.
    pub grant_service: GrantService,
    /// Read-only directory lookups for listings.
    pub directory: Arc<dyn DirectoryRepository>,
}
