use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response},
    Router,
};
use authgate::{
    api::{build_router, ApiState},
    auth::{bootstrap::ensure_super_admin, JwtService, User},
    auth::{user::CreateUserRequest, validation::CreateGroupRequest},
    config::{AuthConfig, DatabaseConfig},
    storage::{create_pool, DbPool},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PUBLIC_PREFIX: &str = "/api/v1/auth";
pub const ADMIN_PASSWORD: &str = "Bootstrap123";
pub const SECRET: &[u8] = b"integration-test-secret-long-enough!!";

pub struct TestApp {
    state: ApiState,
    pub pool: DbPool,
    pub jwt: JwtService,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), PUBLIC_PREFIX)
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// Create a group and a member of it, returning the member.
    pub async fn create_member(&self, username: &str, group: &str, permissions: &[&str]) -> User {
        if self.state.group_service.get_group_by_name(group).await.is_err() {
            self.state
                .group_service
                .create_group(CreateGroupRequest {
                    name: group.to_string(),
                    description: format!("{} group", group),
                    permissions: permissions.iter().map(|p| p.to_string()).collect(),
                })
                .await
                .expect("create group");
        }

        self.state
            .user_service
            .create_user(CreateUserRequest {
                first_name: "Test".into(),
                last_name: "User".into(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "Password123".into(),
                group_name: group.to_string(),
                enabled: true,
            })
            .await
            .expect("create user")
    }

    /// Log in through the HTTP API and return the raw token pair.
    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let response = send_request(
            self,
            Method::POST,
            &format!("{}/authenticate", PUBLIC_PREFIX),
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(response.status(), 200, "login failed for {}", username);

        let body: Value = read_json(response).await;
        (
            body["accessToken"].as_str().expect("access token").to_string(),
            body["refreshToken"].as_str().expect("refresh token").to_string(),
        )
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await.0
    }
}

pub async fn setup_test_app() -> TestApp {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        auto_migrate: true,
        ..Default::default()
    })
    .await
    .expect("create sqlite pool");

    let jwt = JwtService::new(SECRET, "authgate");
    let state = ApiState::new(pool.clone(), jwt.clone());

    let config =
        AuthConfig { bootstrap_admin_password: Some(ADMIN_PASSWORD.into()), ..AuthConfig::default() };
    ensure_super_admin(&state.group_service, &state.user_service, &config)
        .await
        .expect("seed super admin");

    TestApp { state, pool, jwt }
}

pub async fn send_request(
    app: &TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(json) = body {
        let bytes = serde_json::to_vec(&json).expect("serialize body");
        builder
            .header("content-type", "application/json")
            .body(Body::from(bytes))
            .expect("build request")
    } else {
        builder.body(Body::empty()).expect("build request")
    };

    app.router().oneshot(request).await.expect("request")
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

pub async fn read_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.expect("read body").to_vec()
}
