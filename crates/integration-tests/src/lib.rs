//! Integration tests for StoreRate.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios
//! cargo test -p storerate-integration-tests
//!
//! # Including the PostgreSQL-backed tests
//! STORERATE_TEST_DATABASE_URL=postgres://... cargo test -p storerate-integration-tests -- --include-ignored
//! ```
//!
//! [`TestApp`] drives the complete router, middleware included, through
//! `tower::ServiceExt::oneshot`. No socket is opened.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storerate_api::config::ApiConfig;
use storerate_api::db::{MIGRATOR, MemoryRepository, PgRepository, Repository};
use storerate_api::models::CreateUserRequest;
use storerate_api::services::auth::create_account;
use storerate_api::state::AppState;

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "Admin@1234";

const JWT_SECRET: &str = "k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%Gf5";

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub token: String,
}

/// The application over a chosen storage backend.
pub struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    /// The application over a fresh in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::with_repo(Arc::new(MemoryRepository::new()))
    }

    #[must_use]
    pub fn with_repo(repo: Arc<dyn Repository>) -> Self {
        let config = ApiConfig::local(SecretString::from(JWT_SECRET.to_owned()));
        let state = AppState::new(config, repo);
        Self {
            router: storerate_api::app(state.clone()),
            state,
        }
    }

    /// The application over the database named by
    /// `STORERATE_TEST_DATABASE_URL`, migrated and emptied.
    pub async fn postgres() -> Self {
        let url = std::env::var("STORERATE_TEST_DATABASE_URL")
            .expect("STORERATE_TEST_DATABASE_URL must be set for database tests");
        let pool = storerate_api::db::create_pool(&SecretString::from(url))
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();
        sqlx::query("TRUNCATE ratings, stores, users RESTART IDENTITY CASCADE")
            .execute(&pool)
            .await
            .unwrap();
        Self::with_repo(Arc::new(PgRepository::new(pool)))
    }

    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.state.repo()
    }

    /// Send one request and decode the body as JSON, or as a JSON string when
    /// it is not JSON.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Create an account of any role directly, then sign it in over HTTP.
    pub async fn account(&self, role: &str, email: &str) -> Session {
        let request = CreateUserRequest {
            name: format!("Integration Test {role} Account"),
            email: email.to_owned(),
            password: PASSWORD.to_owned(),
            address: "1 Test Street, Test City".to_owned(),
            role: role.to_owned(),
        };
        let (profile, role) = request.validate().unwrap();
        create_account(self.repo(), profile, role).await.unwrap();
        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> Session {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Session {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    /// Create a store as `admin`, owned by `owner_id`. Returns its id.
    pub async fn store(&self, admin: &Session, email: &str, owner_id: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/stores",
                &admin.token,
                json!({
                    "name": format!("Integration Store {email}"),
                    "email": email,
                    "address": "2 Market Street",
                    "ownerId": owner_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "store creation failed: {body}");
        body["store"]["id"].as_i64().unwrap()
    }

    /// Submit a rating as `user`. Returns the response status.
    pub async fn rate(&self, user: &Session, store_id: i64, value: i64) -> StatusCode {
        self.post(
            "/api/ratings",
            &user.token,
            json!({ "storeId": store_id, "value": value }),
        )
        .await
        .0
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// One account per role plus a store owned by the owner.
pub struct World {
    pub app: TestApp,
    pub admin: Session,
    pub owner: Session,
    pub user: Session,
    pub store_id: i64,
}

impl World {
    pub async fn new() -> Self {
        Self::on(TestApp::new()).await
    }

    pub async fn on(app: TestApp) -> Self {
        let admin = app.account("ADMIN", "admin@storerating.com").await;
        let owner = app.account("OWNER", "owner@storerating.com").await;
        let user = app.account("USER", "user@storerating.com").await;
        let store_id = app.store(&admin, "info@amazingstore.com", owner.id).await;
        Self {
            app,
            admin,
            owner,
            user,
            store_id,
        }
    }
}
