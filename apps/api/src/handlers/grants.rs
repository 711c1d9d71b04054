use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use accesstrack_application::{CreateGrantInput, GrantQuery};
use accesstrack_domain::{GrantId, InstanceId, SystemId, TierId, UserId};

use crate::actor::RequestActor;
use crate::dto::{CreateGrantRequest, GrantListParams, GrantResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_grant_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(payload): Json<CreateGrantRequest>,
) -> ApiResult<(StatusCode, Json<GrantResponse>)> {
    let grant = state
        .grant_service
        .create_grant(
            &actor,
            CreateGrantInput {
                user_id: UserId::from_uuid(payload.user_id),
                system_id: SystemId::from_uuid(payload.system_id),
                tier_id: TierId::from_uuid(payload.tier_id),
                instance_id: payload.instance_id.map(InstanceId::from_uuid),
                notes: payload.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(GrantResponse::from(grant))))
}

pub async fn remove_grant_handler(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(grant_id): Path<Uuid>,
) -> ApiResult<Json<GrantResponse>> {
    let grant = state
        .grant_service
        .remove_grant(&actor, GrantId::from_uuid(grant_id))
        .await?;

    Ok(Json(GrantResponse::from(grant)))
}

pub async fn list_grants_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
    Query(params): Query<GrantListParams>,
) -> ApiResult<Json<Vec<GrantResponse>>> {
    let grants = state
        .grant_service
        .list_grants(GrantQuery {
            user_id: params.user_id.map(UserId::from_uuid),
            system_id: params.system_id.map(SystemId::from_uuid),
            active_only: params.active_only,
        })
        .await?
        .into_iter()
        .map(GrantResponse::from)
        .collect();

    Ok(Json(grants))
}
