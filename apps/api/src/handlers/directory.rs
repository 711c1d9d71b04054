use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use accesstrack_domain::SystemId;

use crate::actor::RequestActor;
use crate::dto::{InstanceResponse, SystemResponse, TierResponse, UserResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_users_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state
        .directory
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn list_systems_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
) -> ApiResult<Json<Vec<SystemResponse>>> {
    let systems = state
        .directory
        .list_systems()
        .await?
        .into_iter()
        .map(SystemResponse::from)
        .collect();

    Ok(Json(systems))
}

pub async fn list_tiers_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
    Path(system_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TierResponse>>> {
    let tiers = state
        .directory
        .list_tiers(SystemId::from_uuid(system_id))
        .await?
        .into_iter()
        .map(TierResponse::from)
        .collect();

    Ok(Json(tiers))
}

pub async fn list_instances_handler(
    State(state): State<AppState>,
    RequestActor(_actor): RequestActor,
    Path(system_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InstanceResponse>>> {
    let instances = state
        .directory
        .list_instances(SystemId::from_uuid(system_id))
        .await?
        .into_iter()
        .map(InstanceResponse::from)
        .collect();

    Ok(Json(instances))
}
