use record_portal::{
    AppConfig, AppState, create_router,
    accounts::{AccountService, AccountsState},
    credential::{Argon2Protector, ProtectorState},
    models::{CreateUserRequest, ROLE_ADMIN, ROLE_USER, User},
    repository::{MemoryRepository, RepositoryState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Test Harness ---

/// A running application instance on an ephemeral port, backed by the
/// in-memory repository. Requests authenticate through the Local-environment
/// `x-user-id` bypass against accounts seeded via the service handle.
struct TestApp {
    address: String,
    accounts: AccountsState,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let protector = Arc::new(Argon2Protector::new()) as ProtectorState;
    let accounts = Arc::new(AccountService::new(repo.clone(), protector)) as AccountsState;

    let state = AppState {
        accounts: accounts.clone(),
        repo,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, accounts }
}

impl TestApp {
    /// Seeds an account directly through the service and returns it.
    async fn seed_user(&self, username: &str, roles: &[&str]) -> User {
        for role in roles {
            self.accounts.ensure_role(role).await.unwrap();
        }
        self.accounts
            .create_user(CreateUserRequest {
                username: username.to_string(),
                password: "integration-test-password".to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            })
            .await
            .unwrap()
    }
}

// --- Tests ---

#[tokio::test]
async fn health_check_responds_ok() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("request failed");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn registration_creates_an_account_without_leaking_the_credential() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({ "username": "walter", "password": "hunter2hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "walter");
    assert_eq!(body["active"], true);
    // The protected credential never appears in responses.
    assert!(body.get("password").is_none());
    // Self-registration always lands on the default role.
    assert_eq!(body["roles"][0]["name"], ROLE_USER);

    // Re-registering the same username is a conflict.
    let duplicate = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({ "username": "walter", "password": "hunter2hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);
}

#[tokio::test]
async fn registration_rejects_missing_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({ "username": "xavier", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn user_listing_requires_authentication() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/users", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn user_listing_is_visibility_filtered_per_caller() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let admin = app.seed_user("admin", &[ROLE_ADMIN]).await;
    let alice = app.seed_user("alice", &[]).await;
    app.seed_user("bob", &[]).await;

    // A plain caller sees exactly their own record.
    let own: Vec<serde_json::Value> = client
        .get(format!("{}/users", app.address))
        .header("x-user-id", alice.id.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["username"], "alice");

    // The administrator holds the blanket read authority and sees everyone.
    let all: Vec<serde_json::Value> = client
        .get(format!("{}/users", app.address))
        .header("x-user-id", admin.id.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn unknown_user_lookup_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let caller = app.seed_user("carol", &[]).await;

    let response = client
        .get(format!("{}/users/{}", app.address, Uuid::new_v4()))
        .header("x-user-id", caller.id.to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn account_deletion_is_gated_on_the_admin_authority() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let admin = app.seed_user("admin", &[ROLE_ADMIN]).await;
    let plain = app.seed_user("dave", &[]).await;
    let victim = app.seed_user("victim", &[]).await;

    // A non-administrator is refused before the store is touched.
    let refused = client
        .delete(format!("{}/admin/users/{}", app.address, victim.id))
        .header("x-user-id", plain.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), 403);

    // The record survived the refused attempt.
    let still_there = client
        .get(format!("{}/users/{}", app.address, victim.id))
        .header("x-user-id", plain.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(still_there.status(), 200);

    // The administrator receives the removed snapshot.
    let removed = client
        .delete(format!("{}/admin/users/{}", app.address, victim.id))
        .header("x-user-id", admin.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), 200);
    let snapshot: serde_json::Value = removed.json().await.unwrap();
    assert_eq!(snapshot["username"], "victim");

    // A second deletion reports not-found.
    let again = client
        .delete(format!("{}/admin/users/{}", app.address, victim.id))
        .header("x-user-id", admin.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 404);
}

#[tokio::test]
async fn admin_account_creation_honors_requested_roles() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let admin = app.seed_user("admin", &[ROLE_ADMIN]).await;
    let plain = app.seed_user("erin", &[]).await;

    // A plain caller may not create accounts with explicit roles.
    let refused = client
        .post(format!("{}/admin/users", app.address))
        .header("x-user-id", plain.id.to_string())
        .json(&serde_json::json!({
            "username": "second-admin",
            "password": "another-admin-password",
            "roles": [ROLE_ADMIN]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), 403);

    let created = client
        .post(format!("{}/admin/users", app.address))
        .header("x-user-id", admin.id.to_string())
        .json(&serde_json::json!({
            "username": "second-admin",
            "password": "another-admin-password",
            "roles": [ROLE_ADMIN]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let body: serde_json::Value = created.json().await.unwrap();
    assert_eq!(body["roles"][0]["name"], ROLE_ADMIN);
}

#[tokio::test]
async fn article_lifecycle_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let author = app.seed_user("frank", &[]).await;

    // Writes require authentication.
    let anonymous = client
        .post(format!("{}/articles", app.address))
        .json(&serde_json::json!({ "title": "t", "content": "c", "author": "a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    // Create.
    let created = client
        .post(format!("{}/articles", app.address))
        .header("x-user-id", author.id.to_string())
        .json(&serde_json::json!({
            "title": "On Records",
            "content": "Everything is a record.",
            "author": "frank"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let article: serde_json::Value = created.json().await.unwrap();
    let article_id = article["id"].as_str().unwrap().to_string();

    // Anonymous read of the public listing.
    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/articles", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.iter().any(|a| a["id"] == article["id"]));

    // Update.
    let updated = client
        .put(format!("{}/articles/{}", app.address, article_id))
        .header("x-user-id", author.id.to_string())
        .json(&serde_json::json!({ "title": "On Records, Revised" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated_body: serde_json::Value = updated.json().await.unwrap();
    assert_eq!(updated_body["title"], "On Records, Revised");
    assert_eq!(updated_body["content"], "Everything is a record.");

    // Delete, then verify it is gone.
    let deleted = client
        .delete(format!("{}/articles/{}", app.address, article_id))
        .header("x-user-id", author.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);

    let gone = client
        .get(format!("{}/articles/{}", app.address, article_id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn me_returns_the_caller_record() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let caller = app.seed_user("grace", &[]).await;

    let body: serde_json::Value = client
        .get(format!("{}/me", app.address))
        .header("x-user-id", caller.id.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["id"], serde_json::json!(caller.id));
    assert_eq!(body["username"], "grace");
}

#[tokio::test]
async fn update_preserves_the_stored_credential() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let caller = app.seed_user("heidi", &[]).await;

    let response = client
        .put(format!("{}/users/{}", app.address, caller.id))
        .header("x-user-id", caller.id.to_string())
        .json(&serde_json::json!({ "username": "heidi-renamed", "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "heidi-renamed");
    assert_eq!(body["active"], false);

    // The stored credential survived the update byte-for-byte.
    let stored = app
        .accounts
        .user_by_username("heidi-renamed")
        .await
        .unwrap();
    assert_eq!(stored.password, caller.password);
}
