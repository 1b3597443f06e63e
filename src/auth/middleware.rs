//! Axum middleware for authentication and authorization.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, field, info_span, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::auth_service::{bearer_token, AuthenticationService, BearerResolution};
use crate::auth::models::{AuthContext, AuthError};
use crate::observability::metrics;

/// State shared by the bearer filter.
#[derive(Clone)]
pub struct AuthLayerState {
    pub service: Arc<AuthenticationService>,
    /// Requests under this path prefix are never inspected.
    pub public_prefix: Arc<str>,
}

impl AuthLayerState {
    pub fn new(service: Arc<AuthenticationService>, public_prefix: impl Into<Arc<str>>) -> Self {
        Self { service, public_prefix: public_prefix.into() }
    }
}

pub type RequiredAuthorities = Arc<Vec<String>>;

/// Establishes the caller's identity from a bearer access token.
///
/// The filter never rejects a request itself: a missing or unusable token
/// leaves the request anonymous and authorization further down answers.
/// Only credential store failures abort the request, with 503.
pub async fn authenticate(
    State(state): State<AuthLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    if path.starts_with(state.public_prefix.as_ref()) {
        return Ok(next.run(request).await);
    }

    let header = request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let Some(token) = bearer_token(header).map(str::to_string) else {
        return Ok(next.run(request).await);
    };

    if request.extensions().get::<AuthContext>().is_some() {
        return Ok(next.run(request).await);
    }

    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %request.method(),
        http.path = %path,
        auth.username = field::Empty,
        correlation_id = %correlation_id
    );

    let resolution = state.service.resolve_bearer(&token).instrument(span.clone()).await;

    match resolution {
        Ok(BearerResolution::Authenticated(context)) => {
            span.record("auth.username", field::display(&context.username));
            metrics::record_request_authentication("authenticated").await;
            request.extensions_mut().insert(context);
        }
        Ok(BearerResolution::Undecodable) => {
            span.in_scope(|| debug!(%correlation_id, "bearer token could not be decoded"));
            metrics::record_request_authentication("anonymous").await;
        }
        Ok(BearerResolution::UnknownSubject(username)) => {
            span.in_scope(|| {
                warn!(%correlation_id, username = %username, "bearer token names an unknown user")
            });
            metrics::record_request_authentication("unknown_subject").await;
        }
        Ok(BearerResolution::Rejected { username, reason }) => {
            span.in_scope(|| {
                debug!(%correlation_id, username = %username, reason, "bearer token rejected")
            });
            metrics::record_request_authentication("rejected").await;
        }
        Err(err) => {
            span.in_scope(|| warn!(%correlation_id, error = %err, "credential store unavailable"));
            metrics::record_request_authentication("store_unavailable").await;
            return Err(ApiError::from(err));
        }
    }

    Ok(next.run(request).await)
}

/// Requires an identity holding every authority in `required`.
///
/// Answers 401 when the request is anonymous and 403 when an authority is
/// missing.
pub async fn require_authorities(
    State(required): State<RequiredAuthorities>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(context) = request.extensions().get::<AuthContext>() else {
        return Err(ApiError::from(AuthError::Unauthenticated));
    };

    if let Some(missing) = required.iter().find(|authority| !context.has_authority(authority)) {
        warn!(
            username = %context.username,
            required = %required.join(" "),
            missing = %missing,
            "authority check failed"
        );
        return Err(ApiError::from(AuthError::Forbidden));
    }

    Ok(next.run(request).await)
}
