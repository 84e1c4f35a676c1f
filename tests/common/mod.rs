#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde_json::Value;
use tower::ServiceExt;

use taskcrypt::{
    config::Config,
    models::user::{NewUser, Role, User},
    repositories::{memory::MemoryStore, user::UserRepository},
    router::build_router,
    state::AppState,
};

pub const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-bytes";

static BASE_VARS: Lazy<HashMap<&'static str, String>> = Lazy::new(|| {
    HashMap::from([
        ("ENCRYPTION_KEY", TEST_KEY_HEX.to_string()),
        ("JWT_SECRET", TEST_JWT_SECRET.to_string()),
        ("AUTH_RATE_LIMIT_PER_SECOND", "0".to_string()),
    ])
});

/// A config with a fixed key, the in-memory store and no rate limiting.
pub fn test_config() -> Config {
    config_with(&[])
}

/// A test config with some variables overridden.
pub fn config_with(overrides: &[(&'static str, &str)]) -> Config {
    let mut vars = BASE_VARS.clone();
    for (key, value) in overrides {
        vars.insert(*key, value.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    app_with(test_config())
}

pub fn app_with(config: Config) -> TestApp {
    let store = MemoryStore::new();
    let state =
        AppState::with_repositories(&config, Arc::new(store.clone()), Arc::new(store)).unwrap();
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

impl TestApp {
    /// Sends one request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Opens a sealed `{"success":true,"encrypted":true,"data":"<hex>"}` body.
    pub fn open(&self, sealed: &Value) -> Value {
        assert_eq!(sealed["success"], true);
        assert_eq!(sealed["encrypted"], true);
        let envelope = sealed["data"].as_str().expect("sealed data is a string");
        serde_json::from_str(&self.state.cipher.decrypt(envelope).unwrap()).unwrap()
    }

    /// Wraps a JSON value as an `{"encryptedData": "<hex>"}` body.
    pub fn seal(&self, value: &Value) -> Value {
        let envelope = self.state.cipher.encrypt(&value.to_string()).unwrap();
        serde_json::json!({ "encryptedData": envelope })
    }

    /// Stores a user directly and issues a credential for them.
    pub async fn user_with_token(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .state
            .users
            .create(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "unused".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = self.state.issuer.issue(&user).unwrap();
        (user, token)
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Serves the app on an ephemeral port and returns its base URL.
pub async fn spawn_app(config: Config) -> String {
    let TestApp { router, .. } = app_with(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}
