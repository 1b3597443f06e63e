use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use crate::support::{
    read_bytes, read_json, send_request, setup_test_app, ADMIN_PASSWORD, PUBLIC_PREFIX,
};

fn authenticate_path() -> String {
    format!("{}/authenticate", PUBLIC_PREFIX)
}

fn refresh_path() -> String {
    format!("{}/refresh-token", PUBLIC_PREFIX)
}

#[tokio::test]
async fn login_returns_a_token_pair_usable_on_protected_routes() {
    let app = setup_test_app().await;

    let (access, refresh) = app.login("admin", ADMIN_PASSWORD).await;
    assert_ne!(access, refresh);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = read_json(response).await;
    assert_eq!(me["username"], "admin");
    assert_eq!(me["groupName"], "Super Admin");
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn login_accepts_email_as_username() {
    let app = setup_test_app().await;
    app.create_member("grace", "Ops", &["admin:read"]).await;

    let response = send_request(
        &app,
        Method::POST,
        &authenticate_path(),
        None,
        Some(json!({ "username": "grace@example.com", "password": "Password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = setup_test_app().await;

    let wrong = send_request(
        &app,
        Method::POST,
        &authenticate_path(),
        None,
        Some(json!({ "username": "admin", "password": "not-the-password" })),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong: Value = read_json(wrong).await;

    let unknown = send_request(
        &app,
        Method::POST,
        &authenticate_path(),
        None,
        Some(json!({ "username": "nobody", "password": "not-the-password" })),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown: Value = read_json(unknown).await;

    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn second_login_revokes_the_first_access_token() {
    let app = setup_test_app().await;

    let (first, _) = app.login("admin", ADMIN_PASSWORD).await;
    let (second, _) = app.login("admin", ADMIN_PASSWORD).await;
    assert_ne!(first, second);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&first), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&second), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let statuses: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM tokens GROUP BY status ORDER BY status",
    )
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(statuses, vec![("active".to_string(), 2), ("revoked".to_string(), 2)]);
}

#[tokio::test]
async fn second_login_retires_the_first_refresh_token() {
    let app = setup_test_app().await;

    let (_, first_refresh) = app.login("admin", ADMIN_PASSWORD).await;
    let (second_access, second_refresh) = app.login("admin", ADMIN_PASSWORD).await;

    let response = send_request(&app, Method::POST, &refresh_path(), Some(&first_refresh), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&second_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_request(&app, Method::POST, &refresh_path(), Some(&second_refresh), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_mints_a_new_access_token_and_echoes_the_refresh_token() {
    let app = setup_test_app().await;
    let (access, refresh) = app.login("admin", ADMIN_PASSWORD).await;

    let response = send_request(&app, Method::POST, &refresh_path(), Some(&refresh), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;

    assert_eq!(body["refreshToken"], refresh.as_str());
    let renewed = body["accessToken"].as_str().unwrap().to_string();
    assert_ne!(renewed, access);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&renewed), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_bearer_answers_empty_ok() {
    let app = setup_test_app().await;

    let response = send_request(&app, Method::POST, &refresh_path(), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_bytes(response).await.is_empty());
}

#[tokio::test]
async fn refresh_rejects_an_access_token() {
    let app = setup_test_app().await;
    let (access, _) = app.login("admin", ADMIN_PASSWORD).await;

    let response = send_request(&app, Method::POST, &refresh_path(), Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_account_cannot_log_in() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(&admin),
        Some(json!({
            "firstName": "Dora",
            "lastName": "Disabled",
            "username": "dora",
            "email": "dora@example.com",
            "password": "Password123",
            "groupName": "Super Admin",
            "enabled": false
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send_request(
        &app,
        Method::POST,
        &authenticate_path(),
        None,
        Some(json!({ "username": "dora", "password": "Password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(response).await;
    assert_eq!(body["message"], "User account is disabled");
}
