//! User management handlers. Authority checks happen in the router.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::AuthContext;
use crate::auth::user::{
    AssignGroupRequest, CreateUserRequest, UpdateUserRequest, UserResponse,
};
use crate::domain::{Page, PageRequest, UserId};

pub async fn list_users(
    State(state): State<ApiState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let users = state.user_service.list_users(&page).await?;
    Ok(Json(users.map(UserResponse::from)))
}

pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get_user(&UserId::from_string(id)).await?;
    Ok(Json(user.into()))
}

/// The identity behind the presented access token.
pub async fn current_user(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get_user(&context.user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, context, payload), fields(username = %payload.username, actor = %context.username))]
pub async fn create_user(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.user_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload), fields(user_id = %id))]
pub async fn update_user(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.update_user(&UserId::from_string(id), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload), fields(user_id = %id, group = %payload.group_name))]
pub async fn assign_group(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<AssignGroupRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.assign_group(&UserId::from_string(id), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state), fields(user_id = %id))]
pub async fn delete_user(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(&UserId::from_string(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
