use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tenantmanager::auth::{hash_password_with_cost, TokenService};
use tenantmanager::configuration::JwtSettings;
use tenantmanager::maintenance::{InMemoryMaintenanceRepository, ListingCache};
use tenantmanager::session::MemoryStore;
use tenantmanager::startup::{run, AppServices};
use tenantmanager::users::{CredentialStore, InMemoryUserStore, Role, User};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn signin(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(&format!("{}/api/auth/signin", self.address))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/maintenance/create", self.address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn list(&self, token: &str, query: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/admin/maintenance{}", self.address, query))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn listed(&self, token: &str, query: &str) -> Vec<Value> {
        let response = self.list(token, query).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.unwrap()
    }

    async fn put(&self, token: &str, path: &str, body: Option<Value>) -> reqwest::Response {
        let mut request = self
            .client
            .put(&format!("{}/api/admin/maintenance/{}", self.address, path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Failed to execute request.")
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

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

    let tokens = TokenService::new(&JwtSettings {
        secret: "maintenance-test-secret-at-least-32-bytes".to_string(),
        expiration_seconds: 36_000,
        issuer: "tenantmanager".to_string(),
    })
    .expect("Failed to build token service");

    let services = AppServices::new(
        users,
        Arc::new(InMemoryMaintenanceRepository::new()),
        Arc::new(MemoryStore::new()),
        tokens,
        Duration::from_secs(36_000),
        ListingCache::new(100),
    );
    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

fn leak() -> Value {
    json!({ "unitNumber": "101", "department": "PLUMBING", "description": "leak" })
}

// --- Tenant submissions ---

#[tokio::test]
async fn create_files_open_request_under_caller() {
    let app = spawn_app().await;
    let token = app.signin("alice", "correct-pw").await;

    let response = app.create(&token, leak()).await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tenantName"], "alice");
    assert_eq!(body["unitNumber"], "101");
    assert_eq!(body["department"], "PLUMBING");
    assert_eq!(body["status"], "OPEN");
    assert_eq!(body["approved"], false);
    assert!(body["id"].as_str().is_some());
}

#[tokio::test]
async fn create_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/api/maintenance/create", app.address))
        .json(&leak())
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn duplicate_request_is_conflict() {
    let app = spawn_app().await;
    let token = app.signin("alice", "correct-pw").await;
    assert_eq!(201, app.create(&token, leak()).await.status().as_u16());

    let response = app.create(&token, leak()).await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn invalid_submissions_are_bad_requests() {
    let app = spawn_app().await;
    let token = app.signin("alice", "correct-pw").await;
    let long_description = "x".repeat(2001);
    let cases = vec![
        (json!({ "unitNumber": "", "department": "PLUMBING", "description": "leak" }), "empty unit"),
        (json!({ "unitNumber": "101", "department": "PLUMBING", "description": long_description }), "long description"),
        (json!({ "unitNumber": "101", "department": "GARDENING", "description": "weeds" }), "unknown department"),
        (json!({ "unitNumber": "101", "description": "leak" }), "missing department"),
    ];

    for (body, case) in cases {
        let response = app.create(&token, body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request for {}.",
            case
        );
    }
}

// --- Administration ---

#[tokio::test]
async fn admin_routes_reject_tenants_and_anonymous() {
    let app = spawn_app().await;
    let tenant = app.signin("alice", "correct-pw").await;

    assert_eq!(403, app.list(&tenant, "").await.status().as_u16());
    assert_eq!(
        403,
        app.put(&tenant, &format!("{}/approve", uuid::Uuid::new_v4()), None)
            .await
            .status()
            .as_u16()
    );

    let anonymous = app
        .client
        .get(&format!("{}/api/admin/maintenance", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, anonymous.status().as_u16());
}

#[tokio::test]
async fn create_then_approve_updates_every_listing() {
    let app = spawn_app().await;
    let tenant = app.signin("alice", "correct-pw").await;
    let admin = app.signin("admin", "admin-pw").await;

    let created: Value = app.create(&tenant, leak()).await.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // warm every filter shape
    assert_eq!(app.listed(&admin, "").await.len(), 1);
    assert_eq!(app.listed(&admin, "?status=OPEN").await.len(), 1);
    assert_eq!(app.listed(&admin, "?department=PLUMBING").await.len(), 1);
    assert_eq!(app.listed(&admin, "?status=OPEN&department=PLUMBING").await.len(), 1);
    assert!(app.listed(&admin, "?status=IN_PROGRESS&department=ALL").await.is_empty());

    let response = app.put(&admin, &format!("{}/approve", id), None).await;
    assert_eq!(200, response.status().as_u16());
    let approved: Value = response.json().await.unwrap();
    assert_eq!(approved["approved"], true);
    assert_eq!(approved["status"], "IN_PROGRESS");

    let all = app.listed(&admin, "?status=ALL&department=ALL").await;
    assert_eq!(all[0]["status"], "IN_PROGRESS");
    assert!(app.listed(&admin, "?status=OPEN").await.is_empty());
    assert!(app.listed(&admin, "?status=OPEN&department=PLUMBING").await.is_empty());
    assert_eq!(app.listed(&admin, "?status=IN_PROGRESS&department=ALL").await.len(), 1);
    assert_eq!(app.listed(&admin, "?department=PLUMBING").await[0]["approved"], true);
}

#[tokio::test]
async fn reject_and_status_update() {
    let app = spawn_app().await;
    let tenant = app.signin("alice", "correct-pw").await;
    let admin = app.signin("admin", "admin-pw").await;
    let created: Value = app.create(&tenant, leak()).await.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let rejected: Value = app
        .put(&admin, &format!("{}/reject", id), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["approved"], false);

    let response = app
        .put(&admin, &format!("{}/status", id), Some(json!({ "status": "RESOLVED" })))
        .await;
    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.listed(&admin, "?status=RESOLVED").await.len(), 1);

    let bad = app
        .put(&admin, &format!("{}/status", id), Some(json!({ "status": "DONE" })))
        .await;
    assert_eq!(400, bad.status().as_u16());
}

#[tokio::test]
async fn reject_unknown_request_is_not_found_and_changes_nothing() {
    let app = spawn_app().await;
    let tenant = app.signin("alice", "correct-pw").await;
    let admin = app.signin("admin", "admin-pw").await;
    app.create(&tenant, leak()).await;
    let before = app.listed(&admin, "").await;

    let missing = uuid::Uuid::new_v4();
    let response = app.put(&admin, &format!("{}/reject", missing), None).await;

    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains(&missing.to_string()));
    assert_eq!(app.listed(&admin, "").await, before);
}

#[tokio::test]
async fn unknown_filter_value_is_bad_request() {
    let app = spawn_app().await;
    let admin = app.signin("admin", "admin-pw").await;

    assert_eq!(400, app.list(&admin, "?status=DONE").await.status().as_u16());
}
