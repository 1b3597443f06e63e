use axum::http::{Method, StatusCode};
use authgate::auth::TokenKind;
use serde_json::json;

use crate::support::{send_request, setup_test_app, ADMIN_PASSWORD};

#[tokio::test]
async fn missing_or_malformed_bearer_is_anonymous() {
    let app = setup_test_app().await;

    let response = send_request(&app, Method::GET, "/api/v1/users", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response =
        send_request(&app, Method::GET, "/api/v1/users", Some("not-a-valid-token"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn well_signed_token_never_issued_is_rejected() {
    let app = setup_test_app().await;
    let forged = app.jwt.generate_token("admin", TokenKind::Access).unwrap();

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&forged), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_an_unknown_user_is_anonymous() {
    let app = setup_test_app().await;
    let ghost = app.jwt.generate_token("ghost", TokenKind::Access).unwrap();

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&ghost), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_user_loses_access() {
    let app = setup_test_app().await;
    let member = app.create_member("temp", "Readers", &["admin:read"]).await;
    let (token, _) = app.login("temp", "Password123").await;

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.state().user_service.delete_user(&member.id).await.unwrap();

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_is_not_a_bearer_credential() {
    let app = setup_test_app().await;
    let (_, refresh) = app.login("admin", ADMIN_PASSWORD).await;

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&refresh), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn renamed_user_token_does_not_pass_to_a_new_holder_of_the_name() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;
    let original = app.create_member("alice", "Readers", &["admin:read"]).await;
    let (token, _) = app.login("alice", "Password123").await;

    let response = send_request(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{}", original.id),
        Some(&admin),
        Some(json!({ "username": "alice2" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let successor = app.create_member("alice", "Deleters", &["admin:delete"]).await;
    assert_ne!(successor.id, original.id);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_open() {
    let app = setup_test_app().await;

    let response = send_request(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
