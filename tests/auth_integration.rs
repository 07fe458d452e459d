use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tenantmanager::auth::{hash_password_with_cost, TokenService};
use tenantmanager::configuration::JwtSettings;
use tenantmanager::error::SessionError;
use tenantmanager::maintenance::{InMemoryMaintenanceRepository, ListingCache};
use tenantmanager::session::{session_key, token_key, KeyValueStore, MemoryStore};
use tenantmanager::startup::{run, AppServices};
use tenantmanager::users::{CredentialStore, InMemoryUserStore, Role, User};

const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
}

fn tokens() -> TokenService {
    TokenService::new(&JwtSettings {
        secret: TEST_SECRET.to_string(),
        expiration_seconds: 36_000,
        issuer: "tenantmanager".to_string(),
    })
    .expect("Failed to build token service")
}

async fn users() -> Arc<InMemoryUserStore> {
    let users = Arc::new(InMemoryUserStore::new());
    for (username, password, role) in [
        ("alice", "correct-pw", Role::Tenant),
        ("admin", "admin-pw", Role::Admin),
    ] {
        users
            .insert_user(&User {
                username: username.to_string(),
                password_hash: hash_password_with_cost(password, 4).unwrap(),
                role,
            })
            .await
            .expect("Failed to seed user");
    }
    users
}

fn serve(store: Arc<dyn KeyValueStore>, users: Arc<InMemoryUserStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let services = AppServices::new(
        users,
        Arc::new(InMemoryMaintenanceRepository::new()),
        store,
        tokens(),
        Duration::from_secs(36_000),
        ListingCache::new(100),
    );
    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let address = serve(store.clone(), users().await);
    TestApp { address, store }
}

async fn signin(app: &TestApp, username: &str, password: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(&format!("{}/api/auth/signin", &app.address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn token_for(app: &TestApp, username: &str, password: &str) -> String {
    let response = signin(app, username, password).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn me(app: &TestApp, token: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(&format!("{}/api/auth/me", &app.address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn logout(app: &TestApp, authorization: Option<&str>) -> reqwest::Response {
    let mut request = reqwest::Client::new().post(&format!("{}/api/auth/logout", &app.address));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    request.send().await.expect("Failed to execute request.")
}

// --- Sign-in ---

#[tokio::test]
async fn signin_returns_token_and_user() {
    let app = spawn_app().await;

    let response = signin(&app, "alice", "correct-pw").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "TENANT");

    let token = body["token"].as_str().unwrap();
    let verified = tokens().verify(token).unwrap();
    assert_eq!(verified.username, "alice");
    assert_eq!(verified.role, Role::Tenant);
    assert!(app.store.exists(&token_key(token)).await.unwrap());
    assert_eq!(
        app.store.get(&session_key("alice")).await.unwrap().as_deref(),
        Some(token)
    );
}

#[tokio::test]
async fn signin_failures_are_indistinguishable_and_store_nothing() {
    let app = spawn_app().await;

    let wrong_password = signin(&app, "alice", "wrong-pw").await;
    let unknown_user = signin(&app, "mallory", "correct-pw").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_user.status().as_u16());
    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
    assert!(app.store.is_empty());
}

// --- Gate ---

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/auth/me", &app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_echoes_authenticated_identity() {
    let app = spawn_app().await;
    let token = token_for(&app, "admin", "admin-pw").await;

    let response = me(&app, &token).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["authorities"], json!(["ROLE_ADMIN"]));
}

#[tokio::test]
async fn validly_signed_token_without_session_is_anonymous() {
    let app = spawn_app().await;
    let token = tokens().issue("alice", Role::Tenant).unwrap();

    let response = me(&app, &token).await;

    assert_eq!(401, response.status().as_u16());
}

// --- Logout ---

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = spawn_app().await;
    let token = token_for(&app, "alice", "correct-pw").await;
    assert_eq!(200, me(&app, &token).await.status().as_u16());

    let response = logout(&app, Some(&format!("Bearer {}", token))).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Logged out successfully");
    assert!(!app.store.exists(&token_key(&token)).await.unwrap());
    assert!(!app.store.exists(&session_key("alice")).await.unwrap());

    // token still verifies but is no longer honoured
    assert!(tokens().verify(&token).is_ok());
    assert_eq!(401, me(&app, &token).await.status().as_u16());
}

#[tokio::test]
async fn logout_requires_bearer_header() {
    let app = spawn_app().await;

    assert_eq!(400, logout(&app, None).await.status().as_u16());
    assert_eq!(400, logout(&app, Some("Basic YWxpY2U6cHc=")).await.status().as_u16());
    assert_eq!(400, logout(&app, Some("Bearer ")).await.status().as_u16());
}

#[tokio::test]
async fn logout_with_unverifiable_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = logout(&app, Some("Bearer not.a.token")).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn second_login_leaves_first_token_live_after_logout() {
    let app = spawn_app().await;
    let first = token_for(&app, "alice", "correct-pw").await;
    let second = token_for(&app, "alice", "correct-pw").await;
    assert_ne!(first, second);

    let response = logout(&app, Some(&format!("Bearer {}", second))).await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(401, me(&app, &second).await.status().as_u16());
    assert_eq!(200, me(&app, &first).await.status().as_u16());
}

// --- Session store outage ---

struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn set_with_ttl(&self, _: &str, _: &str, _: Duration) -> Result<(), SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<String>, SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }

    async fn exists(&self, _: &str) -> Result<bool, SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<(), SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }

    async fn expire(&self, _: &str, _: Duration) -> Result<bool, SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }

    async fn ttl(&self, _: &str) -> Result<Option<Duration>, SessionError> {
        Err(SessionError::StoreUnavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn session_store_outage_is_service_unavailable() {
    let address = serve(Arc::new(UnavailableStore), users().await);
    let client = reqwest::Client::new();
    let token = tokens().issue("alice", Role::Tenant).unwrap();

    let signin = client
        .post(&format!("{}/api/auth/signin", address))
        .json(&json!({ "username": "alice", "password": "correct-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(503, signin.status().as_u16());

    let protected = client
        .get(&format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(503, protected.status().as_u16());

    // no token, no store lookup
    let health = client
        .get(&format!("{}/health_check", address))
        .send()
        .await
        .unwrap();
    assert_eq!(200, health.status().as_u16());
}
