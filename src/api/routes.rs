use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::{
    auth_service::AuthenticationService,
    authorization::requires,
    group_service::GroupService,
    jwt::JwtService,
    middleware::{authenticate, require_authorities, AuthLayerState},
    user_service::UserService,
};
use crate::domain::Permission;
use crate::observability::trace_http_requests;
use crate::storage::DbPool;

use super::handlers::{self, authenticate_handler, health_handler, refresh_token_handler};

#[derive(Clone)]
pub struct ApiState {
    pub pool: DbPool,
    pub auth_service: Arc<AuthenticationService>,
    pub user_service: Arc<UserService>,
    pub group_service: Arc<GroupService>,
}

impl ApiState {
    pub fn new(pool: DbPool, jwt: JwtService) -> Self {
        Self {
            auth_service: Arc::new(AuthenticationService::with_sqlx(pool.clone(), jwt)),
            user_service: Arc::new(UserService::with_sqlx(pool.clone())),
            group_service: Arc::new(GroupService::with_sqlx(pool.clone())),
            pool,
        }
    }
}

/// Build the HTTP router. `public_prefix` is the path prefix the bearer
/// filter leaves alone; the login and refresh routes live under it.
pub fn build_router(state: ApiState, public_prefix: &str) -> Router {
    let auth_layer = middleware::from_fn_with_state(
        AuthLayerState::new(state.auth_service.clone(), public_prefix),
        authenticate,
    );

    let guard = |permission: Permission| {
        middleware::from_fn_with_state(requires(&[permission]), require_authorities)
    };

    let public = Router::new()
        .route(&format!("{public_prefix}/authenticate"), post(authenticate_handler))
        .route(&format!("{public_prefix}/refresh-token"), post(refresh_token_handler));

    let secured = Router::new()
        .merge(
            Router::new()
                .route("/api/v1/users", get(handlers::users::list_users))
                .route("/api/v1/users/{id}", get(handlers::users::get_user))
                .route("/api/v1/groups", get(handlers::groups::list_groups))
                .route("/api/v1/groups/{id}", get(handlers::groups::get_group))
                .route_layer(guard(Permission::AdminRead)),
        )
        .merge(
            Router::new()
                .route("/api/v1/users", post(handlers::users::create_user))
                .route("/api/v1/groups", post(handlers::groups::create_group))
                .route_layer(guard(Permission::AdminCreate)),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/{id}", put(handlers::users::update_user))
                .route("/api/v1/users/{id}/group", put(handlers::users::assign_group))
                .route("/api/v1/groups/{id}", put(handlers::groups::update_group))
                .route_layer(guard(Permission::AdminUpdate)),
        )
        .merge(
            Router::new()
                .route("/api/v1/users/{id}", delete(handlers::users::delete_user))
                .route("/api/v1/groups/{id}", delete(handlers::groups::delete_group))
                .route_layer(guard(Permission::AdminDelete)),
        )
        .merge(
            Router::new()
                .route("/api/v1/me", get(handlers::users::current_user))
                .route_layer(middleware::from_fn_with_state(
                    Arc::new(Vec::new()),
                    require_authorities,
                )),
        );

    Router::new()
        .route("/health", get(health_handler))
        .merge(public)
        .merge(secured)
        .layer(auth_layer)
        .layer(middleware::from_fn(trace_http_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
