// Handler tests for the User Auth API
// Exercises the full router (gate, handlers, error format) against the in-memory store

use super::*;
use argon2::Params;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

use crate::auth::JwtSecret;
use crate::users::{InMemoryUserRepository, LoginResponse, UserResponse};

const TEST_SECRET: &str = "test_secret_key_for_testing_purposes";

// ============================================================================
// Test Helpers
// ============================================================================

/// Helper function to create a test app backed by an empty in-memory store
fn create_test_app() -> TestServer {
    let token_service = Arc::new(TokenService::new(JwtSecret::new(TEST_SECRET)));
    let passwords = PasswordService::new(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap());
    let user_service = Arc::new(UserService::new(
        Arc::new(InMemoryUserRepository::new()),
        passwords,
        token_service.clone(),
    ));
    let state = AppState {
        user_service,
        token_service,
    };

    let origins = vec!["http://localhost:5500".to_string()];
    TestServer::new(create_router(state, &origins)).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn register_payload(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "password": "secret1"
    })
}

/// Registers a user and logs in, returning the bearer token
async fn register_and_login(server: &TestServer, username: &str, email: &str) -> String {
    let response = server
        .post("/auth/register")
        .json(&register_payload(username, email))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = server
        .post("/auth/login")
        .json(&json!({ "username": username, "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    response.json::<LoginResponse>().token
}

async fn current_user(server: &TestServer, token: &str) -> UserResponse {
    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer(token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json()
}

// ============================================================================
// Registration Tests (POST /auth/register)
// ============================================================================

#[tokio::test]
async fn test_register_success() {
    let server = create_test_app();

    let response = server
        .post("/auth/register")
        .json(&register_payload("alice", "alice@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User registered successfully");
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let server = create_test_app();
    server
        .post("/auth/register")
        .json(&register_payload("alice", "alice@example.com"))
        .await;

    let response = server
        .post("/auth/register")
        .json(&register_payload("alice", "other@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "CONFLICT");
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = create_test_app();
    server
        .post("/auth/register")
        .json(&register_payload("alice", "alice@example.com"))
        .await;

    let response = server
        .post("/auth/register")
        .json(&register_payload("bob", "alice@example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_register_invalid_fields() {
    let server = create_test_app();

    let invalid_payloads = vec![
        json!({ "username": "al", "email": "alice@example.com", "password": "secret1" }),
        json!({ "username": "   ", "email": "alice@example.com", "password": "secret1" }),
        json!({ "username": "alice", "email": "not-an-email", "password": "secret1" }),
        json!({ "username": "alice", "email": "alice@example.com", "password": "short" }),
    ];

    for payload in invalid_payloads {
        let response = server.post("/auth/register").json(&payload).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{payload}");
        let body: serde_json::Value = response.json();
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert!(body["details"].is_object());
    }
}

#[tokio::test]
async fn test_register_malformed_json() {
    let server = create_test_app();

    let response = server
        .post("/auth/register")
        .text("{\"username\": \"alice\",")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_register_missing_field() {
    let server = create_test_app();

    let response = server
        .post("/auth/register")
        .json(&json!({ "username": "alice", "password": "secret1" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login Tests (POST /auth/login)
// ============================================================================

#[tokio::test]
async fn test_login_by_username_and_email() {
    let server = create_test_app();
    register_and_login(&server, "alice", "alice@example.com").await;

    let response = server
        .post("/auth/login")
        .json(&json!({ "username": "alice@example.com", "password": "secret1" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(!response.json::<LoginResponse>().token.is_empty());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = create_test_app();
    register_and_login(&server, "alice", "alice@example.com").await;

    let wrong_password = server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    let unknown_user = server
        .post("/auth/login")
        .json(&json!({ "username": "nobody", "password": "secret1" }))
        .await;

    assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status_code(), StatusCode::UNAUTHORIZED);

    let wrong_password: serde_json::Value = wrong_password.json();
    let unknown_user: serde_json::Value = unknown_user.json();
    assert_eq!(wrong_password["message"], "Invalid credentials");
    assert_eq!(wrong_password["message"], unknown_user["message"]);
    assert_eq!(wrong_password["error_code"], unknown_user["error_code"]);
}

#[tokio::test]
async fn test_login_empty_fields() {
    let server = create_test_app();

    let response = server
        .post("/auth/login")
        .json(&json!({ "username": "", "password": "" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Authorization Gate Tests
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_app();

    let response = server.get("/api/perfil").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.get("/api/users/1").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.delete("/api/users/1").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gate_rejects_malformed_header() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;

    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, HeaderValue::from_str(&token).unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid authorization header format");
}

#[tokio::test]
async fn test_gate_rejects_garbage_token() {
    let server = create_test_app();

    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer("garbage"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_gate_rejects_other_signing_algorithm() {
    let server = create_test_app();
    let now = chrono::Utc::now().timestamp();
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &json!({ "user_id": 1, "iat": now, "nbf": now, "exp": now + 3600 }),
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gate_rejects_unsigned_token() {
    let server = create_test_app();
    let now = chrono::Utc::now().timestamp();
    let token = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string()),
        URL_SAFE_NO_PAD
            .encode(json!({ "user_id": 1, "iat": now, "nbf": now, "exp": now + 3600 }).to_string())
    );

    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid or expired token");
}

// ============================================================================
// User Endpoint Tests (/api/users/:id, /api/perfil)
// ============================================================================

#[tokio::test]
async fn test_profile_excludes_password() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;

    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_get_user_by_id() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    let me = current_user(&server, &token).await;

    let response = server
        .get(&format!("/api/users/{}", me.id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<UserResponse>(), me);
}

#[tokio::test]
async fn test_get_user_not_found() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;

    let response = server
        .get("/api/users/99999")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_user_id() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;

    for id in ["abc", "0", "-1"] {
        let response = server
            .get(&format!("/api/users/{}", id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{id}");
    }
}

#[tokio::test]
async fn test_update_user_email() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    let me = current_user(&server, &token).await;

    let response = server
        .put(&format!("/api/users/{}", me.id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "email": "new@example.com" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User updated successfully");

    let updated = current_user(&server, &token).await;
    assert_eq!(updated.email, "new@example.com");
    assert_eq!(updated.username, "alice");
}

#[tokio::test]
async fn test_update_password_changes_login() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    let me = current_user(&server, &token).await;

    server
        .put(&format!("/api/users/{}", me.id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "password": "brand-new-pass" }))
        .await;

    let old = server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "secret1" }))
        .await;
    let new = server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "brand-new-pass" }))
        .await;

    assert_eq!(old.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(new.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_conflict_with_other_user() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    register_and_login(&server, "bob", "bob@example.com").await;
    let me = current_user(&server, &token).await;

    let response = server
        .put(&format!("/api/users/{}", me.id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "username": "bob" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_invalid_email() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    let me = current_user(&server, &token).await;

    let response = server
        .put(&format!("/api/users/{}", me.id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "email": "nope" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_user_then_not_found() {
    let server = create_test_app();
    let token = register_and_login(&server, "alice", "alice@example.com").await;
    let me = current_user(&server, &token).await;
    let path = format!("/api/users/{}", me.id);

    let response = server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User deleted successfully");

    let response = server
        .get(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    // The token outlives the account, but the profile is gone
    let response = server
        .get("/api/perfil")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Error Response Format Tests
// ============================================================================

/// Test that error responses have correct JSON format
#[tokio::test]
async fn test_error_response_format() {
    let server = create_test_app();

    let response = server.get("/api/perfil").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();

    assert!(body["error_code"].is_string());
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert!(body["timestamp"].is_string());
    assert!(body.get("details").is_none());
}

// ============================================================================
// Documentation and CORS Tests
// ============================================================================

#[tokio::test]
async fn test_openapi_document() {
    let server = create_test_app();

    let response = server.get("/api-docs/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let doc: serde_json::Value = response.json();
    assert!(doc["paths"]["/auth/register"].is_object());
    assert!(doc["paths"]["/api/users/{id}"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let server = create_test_app();

    let response = server
        .get("/api-docs/openapi.json")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5500"))
        .await;

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:5500"))
    );
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let server = create_test_app();

    let response = server
        .get("/api-docs/openapi.json")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://evil.example.com"))
        .await;

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
