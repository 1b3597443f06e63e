//! Login and token refresh handlers. Both routes sit under the public prefix
//! and are never inspected by the bearer filter.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::user::{AuthenticationRequest, AuthenticationResponse};

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn authenticate_handler(
    State(state): State<ApiState>,
    Json(payload): Json<AuthenticationRequest>,
) -> Result<Json<AuthenticationResponse>, ApiError> {
    let response = state.auth_service.authenticate(&payload).await?;
    Ok(Json(response))
}

/// Answers 200 with an empty body when no bearer refresh token is presented.
#[instrument(skip(state, headers))]
pub async fn refresh_token_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());

    match state.auth_service.refresh_token(header).await? {
        Some(response) => Ok(Json(response).into_response()),
        None => Ok(StatusCode::OK.into_response()),
    }
}
