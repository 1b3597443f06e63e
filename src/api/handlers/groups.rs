//! Group management handlers. Authority checks happen in the router.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::validation::{CreateGroupRequest, UpdateGroupRequest};
use crate::domain::{Group, GroupId, Page, PageRequest, Permission};

/// Group as exposed by the API, with the authorities it grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<Permission>,
    pub authorities: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        let authorities = group.authorities();
        Self {
            id: group.id,
            name: group.name,
            description: group.description,
            permissions: group.permissions,
            authorities,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

pub async fn list_groups(
    State(state): State<ApiState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<GroupResponse>>, ApiError> {
    let groups = state.group_service.list_groups(&page).await?;
    Ok(Json(groups.map(GroupResponse::from)))
}

pub async fn get_group(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state.group_service.get_group(&GroupId::from_string(id)).await?;
    Ok(Json(group.into()))
}

#[instrument(skip(state, payload), fields(group_name = %payload.name))]
pub async fn create_group(
    State(state): State<ApiState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let group = state.group_service.create_group(payload).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

#[instrument(skip(state, payload), fields(group_id = %id))]
pub async fn update_group(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state.group_service.update_group(&GroupId::from_string(id), payload).await?;
    Ok(Json(group.into()))
}

#[instrument(skip(state), fields(group_id = %id))]
pub async fn delete_group(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.group_service.delete_group(&GroupId::from_string(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
