//! Registration, login, password change and token handling over HTTP.

use axum::http::{Method, StatusCode};
use serde_json::json;

use storerate_integration_tests::{PASSWORD, TestApp};

fn registration(email: &str) -> serde_json::Value {
    json!({
        "name": "Regular User Customer Person",
        "email": email,
        "password": PASSWORD,
        "address": "789 Customer Lane, Customer City",
    })
}

#[tokio::test]
async fn test_register_returns_token_for_user_role() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("new@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["user"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap();

    let (status, me) = app.get("/api/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "new@example.com");
}

#[tokio::test]
async fn test_register_reports_every_bad_field() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Too short",
                "email": "not-an-email",
                "password": "weak",
                "address": "",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    let body = registration("dup@example.com");
    app.request(Method::POST, "/api/auth/register", None, Some(body.clone()))
        .await;
    let (status, body) = app
        .request(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");
}

#[tokio::test]
async fn test_login_failures_look_alike() {
    let app = TestApp::new();
    app.account("USER", "user@storerating.com").await;

    for (email, password) in [
        ("user@storerating.com", "Wrong@1234"),
        ("ghost@storerating.com", PASSWORD),
    ] {
        let (status, body) = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_missing_and_bad_tokens_are_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/stores", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access denied. No token provided.");

    let (status, body) = app.get("/api/stores", "not.a.token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = TestApp::new();
    let admin = app.account("ADMIN", "admin@storerating.com").await;
    let user = app.account("USER", "user@storerating.com").await;

    let (status, _) = app
        .delete(&format!("/api/users/{}", user.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/auth/me", &user.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_change() {
    let app = TestApp::new();
    let user = app.account("USER", "user@storerating.com").await;

    let (status, body) = app
        .put(
            "/api/auth/password",
            &user.token,
            json!({ "currentPassword": "Wrong@1234", "newPassword": "Better#5678" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = app
        .put(
            "/api/auth/password",
            &user.token,
            json!({ "currentPassword": PASSWORD, "newPassword": "nouppercase!" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/api/auth/password",
            &user.token,
            json!({ "currentPassword": PASSWORD, "newPassword": "Better#5678" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "user@storerating.com", "password": "Better#5678" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = TestApp::new();
    let user = app.account("USER", "user@storerating.com").await;
    let (status, body) = app
        .post("/api/ratings", &user.token, json!({ "storeId": "seven" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
