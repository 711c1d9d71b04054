use axum::Json;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;

use accesstrack_application::{BulkValidationReport, csv_template};
use accesstrack_core::AppError;

use crate::actor::RequestActor;
use crate::dto::{BulkCommitResponse, BulkImportRequest, BulkValidationResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Phase one: evaluate the whole batch and return the validity
/// partition without persisting anything.
pub async fn validate_bulk_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
    Json(payload): Json<BulkImportRequest>,
) -> ApiResult<Json<BulkValidationResponse>> {
    let report = build_report(&state, payload).await?;
    Ok(Json(BulkValidationResponse::from(report)))
}

/// Phase two: re-evaluate the batch and insert it atomically. Refused
/// with a batch-level error while any error rows remain.
pub async fn commit_bulk_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(payload): Json<BulkImportRequest>,
) -> ApiResult<Json<BulkCommitResponse>> {
    let report = build_report(&state, payload).await?;
    let inserted_count = state.bulk_import_service.commit(&actor, report).await?;

    Ok(Json(BulkCommitResponse { inserted_count }))
}

/// Serves the CSV upload template.
pub async fn template_handler() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"access_grants_template.csv\"",
            ),
        ],
        csv_template(),
    )
}

async fn build_report(
    state: &AppState,
    payload: BulkImportRequest,
) -> ApiResult<BulkValidationReport> {
    match (payload.csv, payload.rows) {
        (Some(csv), None) => Ok(state.bulk_import_service.validate_csv(&csv).await?),
        (None, Some(rows)) => Ok(state.bulk_import_service.validate_rows(rows).await?),
        _ => Err(ApiError(AppError::Validation(
            "provide exactly one of 'csv' or 'rows'".to_owned(),
        ))),
    }
}
