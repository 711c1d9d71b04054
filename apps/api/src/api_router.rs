use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use accesstrack_core::AppError;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let cors_origin = frontend_url
        .parse::<HeaderValue>()
        .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?;

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let router = Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .route(
            "/api/grants",
            get(handlers::grants::list_grants_handler)
                .post(handlers::grants::create_grant_handler),
        )
        .route(
            "/api/grants/{grant_id}",
            delete(handlers::grants::remove_grant_handler),
        )
        .route(
            "/api/grants/bulk/validate",
            post(handlers::bulk::validate_bulk_handler),
        )
        .route(
            "/api/grants/bulk/commit",
            post(handlers::bulk::commit_bulk_handler),
        )
        .route(
            "/api/grants/bulk/template",
            get(handlers::bulk::template_handler),
        )
        .route("/api/users", get(handlers::directory::list_users_handler))
        .route(
            "/api/systems",
            get(handlers::directory::list_systems_handler),
        )
        .route(
            "/api/systems/{system_id}/tiers",
            get(handlers::directory::list_tiers_handler),
        )
        .route(
            "/api/systems/{system_id}/instances",
            get(handlers::directory::list_instances_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(router)
}
