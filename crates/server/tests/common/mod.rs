//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock distance oracle and a mock mailer injected, so the whole
//! HTTP surface can be exercised without Google or an SMTP relay.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use sendit_core::{
    create_audit_system, load_config_from_str, AuditFilter, AuditRecord, AuditStore,
    DistanceOracle, ShipmentStore, SqliteAuditStore, SqliteShipmentStore, SqliteUserStore,
    UserStore,
    testing::{MockDistanceOracle, MockMailer},
};
use sendit_server::state::{AppState, Collaborators, Stores};

/// Re-export fixtures for test convenience
pub use sendit_core::testing::fixtures;

/// Email that the fixture config grants the admin role.
pub const ADMIN_EMAIL: &str = "admin@sendit.example";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_order() {
///     let fixture = TestFixture::new().await;
///     let alice = fixture.signup("Alice", "alice@example.com", "Nairobi").await;
///
///     let response = alice.post("/orders", order_body("Mombasa")).await;
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock distance oracle - configure route lengths and failures
    pub oracle: Arc<MockDistanceOracle>,
    /// Mock mailer - inspect sent mail, make deliveries fail
    pub mailer: Arc<MockMailer>,
    /// Audit store, read directly to inspect emitted events
    pub audit_store: Arc<dyn AuditStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// `name=value` part of the `Set-Cookie` header, if one was sent
    pub cookie: Option<String>,
}

/// A signed-in client: every request carries its session cookie.
pub struct Client<'a> {
    fixture: &'a TestFixture,
    pub cookie: String,
    /// User id from the signup response
    pub user_id: i64,
}

impl TestFixture {
    /// Create a new test fixture with permissive status transitions.
    pub async fn new() -> Self {
        Self::with_lifecycle(false).await
    }

    /// Create a test fixture, optionally enforcing forward-only status changes.
    pub async fn with_lifecycle(enforce_forward_transitions: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = load_config_from_str(&format!(
            r#"
[auth]
method = "session"
session_ttl_hours = 1
admin_emails = ["{admin}"]

[server]
host = "127.0.0.1"
port = 0

[database]
path = "{db}"

[lifecycle]
enforce_forward_transitions = {enforce}
"#,
            admin = ADMIN_EMAIL,
            db = db_path.display(),
            enforce = enforce_forward_transitions,
        ))
        .expect("Failed to build config");

        let oracle = Arc::new(MockDistanceOracle::new());
        let mailer = Arc::new(MockMailer::new());

        let users: Arc<dyn UserStore> =
            Arc::new(SqliteUserStore::new(&db_path).expect("Failed to create user store"));
        let shipments: Arc<dyn ShipmentStore> = Arc::new(
            SqliteShipmentStore::new(&db_path).expect("Failed to create shipment store"),
        );
        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let state = Arc::new(
            AppState::new(
                config,
                Stores {
                    users,
                    shipments,
                    audit: Arc::clone(&audit_store),
                },
                Collaborators {
                    oracle: Some(Arc::clone(&oracle) as Arc<dyn DistanceOracle>),
                    mailer: Arc::clone(&mailer) as Arc<dyn sendit_core::Mailer>,
                },
                audit_handle,
            )
            .expect("Failed to create app state"),
        );

        let router = sendit_server::api::create_router(state);

        Self {
            router,
            oracle,
            mailer,
            audit_store,
            temp_dir,
        }
    }

    /// Send an anonymous GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send an anonymous POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send an anonymous PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body), None).await
    }

    /// Send an anonymous DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, None).await
    }

    /// Register an account in `city` and return a client signed in as it.
    pub async fn signup(&self, first_name: &str, email: &str, city: &str) -> Client<'_> {
        let body = serde_json::to_value(signup_body(first_name, email, city))
            .expect("Failed to encode signup");
        let response = self.post("/signup", body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "signup failed: {}",
            response.body
        );
        self.client_from(response)
    }

    /// Register the configured admin account.
    pub async fn signup_admin(&self) -> Client<'_> {
        self.signup("Ops", ADMIN_EMAIL, "Nairobi").await
    }

    /// Build a client from a response carrying a session cookie.
    pub fn client_from(&self, response: TestResponse) -> Client<'_> {
        Client {
            fixture: self,
            cookie: response.cookie.expect("response did not set a session cookie"),
            user_id: response.body["user"]["id"]
                .as_i64()
                .expect("response did not include the user id"),
        }
    }

    /// Audit events of one type, oldest first. Waits briefly for the writer.
    pub async fn audit_events(&self, event_type: &str) -> Vec<AuditRecord> {
        let filter = AuditFilter::new().with_event_type(event_type);
        let mut records = Vec::new();
        for _ in 0..20 {
            records = self
                .audit_store
                .query(&filter)
                .expect("Failed to query audit store");
            if !records.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        records.reverse();
        records
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(cookie) = cookie {
            request_builder = request_builder.header(header::COOKIE, cookie);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|pair| pair.trim().to_string());

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse {
            status,
            body,
            cookie,
        }
    }
}

impl Client<'_> {
    pub async fn get(&self, path: &str) -> TestResponse {
        self.fixture
            .request("GET", path, None, Some(&self.cookie))
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.fixture
            .request("POST", path, Some(body), Some(&self.cookie))
            .await
    }

    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.fixture
            .request("PATCH", path, Some(body), Some(&self.cookie))
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.fixture
            .request("DELETE", path, None, Some(&self.cookie))
            .await
    }

    /// Place an order to a new recipient in `city` and return the parcel id.
    pub async fn order_to(&self, first_name: &str, city: &str) -> i64 {
        let response = self.post("/orders", order_body(first_name, city)).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "order failed: {}",
            response.body
        );
        response.body["parcel"]["id"]
            .as_i64()
            .expect("order response did not include a parcel id")
    }
}

/// Signup form for a user living in `city`.
pub fn signup_body(first_name: &str, email: &str, city: &str) -> Value {
    let request = fixtures::signup(first_name, email, city);
    json!({
        "first_name": request.first_name,
        "last_name": request.last_name,
        "email": request.email,
        "password": request.password,
        "phone_number": request.phone_number,
        "street": request.address.street,
        "city": request.address.city,
        "state": request.address.state,
        "zip_code": request.address.zip_code,
        "country": request.address.country,
    })
}

/// Order body shipping the fixture parcel to a new recipient in `city`.
pub fn order_body(first_name: &str, city: &str) -> Value {
    json!({
        "recipient": serde_json::to_value(fixtures::recipient_info(first_name, city)).unwrap(),
        "parcel": serde_json::to_value(fixtures::parcel_info()).unwrap(),
    })
}

/// Helper to assert response status with better error messages.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
