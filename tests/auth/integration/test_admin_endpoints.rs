use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use crate::support::{read_json, send_request, setup_test_app};

#[tokio::test]
async fn admin_manages_groups_and_users() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/groups",
        Some(&admin),
        Some(json!({
            "name": "Managers",
            "description": "People managers",
            "permissions": ["management:read", "MANAGER_UPDATE"]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let group: Value = read_json(response).await;
    assert_eq!(group["permissions"], json!(["management:read", "management:update"]));
    assert!(group["authorities"].as_array().unwrap().contains(&json!("ROLE_Managers")));

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(&admin),
        Some(json!({
            "firstName": "Mona",
            "lastName": "Manager",
            "username": "mona",
            "email": "Mona@Example.com",
            "password": "Password123",
            "groupName": "Managers"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = read_json(response).await;
    assert_eq!(user["email"], "mona@example.com");
    let user_id = user["id"].as_str().unwrap().to_string();

    let response = send_request(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{}/group", user_id),
        Some(&admin),
        Some(json!({ "groupName": "Super Admin" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved: Value = read_json(response).await;
    assert_eq!(moved["groupName"], "Super Admin");

    let response = send_request(&app, Method::GET, "/api/v1/users", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = read_json(response).await;
    assert_eq!(page["totalElements"], 2);
    assert_eq!(page["size"], 10);

    let response = send_request(
        &app,
        Method::DELETE,
        &format!("/api/v1/users/{}", user_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}", user_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_permission_is_rejected_and_group_unchanged() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;
    let member = app.create_member("rita", "Readers", &["admin:read"]).await;

    let response = send_request(
        &app,
        Method::PUT,
        &format!("/api/v1/groups/{}", member.group.id),
        Some(&admin),
        Some(json!({ "permissions": ["admin:read", "admin:fly"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["message"], "Invalid Permission: admin:fly");

    let response = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/groups/{}", member.group.id),
        Some(&admin),
        None,
    )
    .await;
    let group: Value = read_json(response).await;
    assert_eq!(group["permissions"], json!(["admin:read"]));
}

#[tokio::test]
async fn missing_authority_is_forbidden() {
    let app = setup_test_app().await;
    app.create_member("rita", "Readers", &["admin:read"]).await;
    let (reader, _) = app.login("rita", "Password123").await;

    let response = send_request(&app, Method::GET, "/api/v1/groups", Some(&reader), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = read_json(response).await;
    assert_eq!(page["size"], 15);

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/groups",
        Some(&reader),
        Some(json!({ "name": "Sneaky", "permissions": ["admin:create"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(&app, Method::GET, "/api/v1/me", Some(&reader), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn group_in_use_cannot_be_deleted() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;
    let member = app.create_member("rita", "Readers", &["admin:read"]).await;

    let response = send_request(
        &app,
        Method::DELETE,
        &format!("/api/v1/groups/{}", member.group.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = setup_test_app().await;
    let admin = app.admin_token().await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(&admin),
        Some(json!({
            "firstName": "Other",
            "lastName": "Admin",
            "username": "admin",
            "email": "other@example.com",
            "password": "Password123",
            "groupName": "Super Admin"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
