#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cadence_api::{router, AppContext};
use cadence_domain::{Config, Tenant};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Application wired against a temporary database.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    /// No provider credentials: local writes only, sync disabled.
    pub async fn offline() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Provider pointed at a mock calendar API with a static token.
    pub async fn with_calendar(base_url: &str) -> Self {
        let mut config = Config::default();
        config.provider.api_base_url = base_url.to_string();
        config.provider.access_token = Some("static-token".into());
        config.webhook.public_url = Some("https://hooks.example.test/calendar/webhook".into());
        Self::with_config(config).await
    }

    async fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        config.database.path =
            temp_dir.path().join("cadence-api-test.db").to_string_lossy().into_owned();

        let ctx = Arc::new(AppContext::new(config).await.expect("context should build"));
        let router = router(Arc::clone(&ctx));
        Self { ctx, router, _temp_dir: temp_dir }
    }

    pub async fn seed_tenant(&self, name: &str) -> Tenant {
        self.ctx.tenants.create(name).await.expect("tenant should be created")
    }

    /// Send a request and decode the body as JSON (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).expect("request builds")
}

pub fn webhook_request(headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/calendar/webhook");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub fn draft(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Follow-up",
        "starts_at": "2025-09-15T14:00:00Z",
        "ends_at": "2025-09-15T15:00:00Z",
        "location": "Room 1"
    })
}
