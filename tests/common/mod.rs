#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use sports_events_api::app::{app, AppState};
use sports_events_api::config::{AppConfig, Environment};
use sports_events_api::database::MemoryBackend;

pub const PASSWORD: &str = "correct-horse-battery";

/// In-process router over a fresh memory backend
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryBackend>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error(&self) -> Option<&str> {
        self.body["error"].as_str()
    }

    /// The `session` cookie value from Set-Cookie, if one was set
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session="))
            .map(str::to_string)
    }
}

pub fn test_config(require_email_confirmation: bool) -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.security.jwt_secret = "integration-secret".to_string();
    config.security.bcrypt_cost = 4;
    config.security.require_email_confirmation = require_email_confirmation;
    config.api.action_timeout_secs = Some(5);
    config
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config(false))
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::new(backend.clone(), &config);
    TestApp {
        router: app(state, &config),
        backend,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body with status {}", status))?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Sign up (confirmation disabled) and return the bearer token
    pub async fn signed_in(&self, email: &str) -> Result<String> {
        let res = self
            .post("/auth/sign-up", None, json!({ "email": email, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "sign-up failed: {}", res.body);
        res.data()["token"]
            .as_str()
            .map(str::to_string)
            .context("sign-up did not return a token")
    }

    pub async fn venue(&self, token: &str, name: &str, city: &str) -> Result<String> {
        let res = self
            .post(
                "/api/venues",
                Some(token),
                json!({
                    "name": name,
                    "address": "1 Main Street",
                    "city": city,
                    "country": "US"
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "venue create failed: {}", res.body);
        res.data()["id"].as_str().map(str::to_string).context("venue id missing")
    }
}

pub fn event_body(name: &str, sport_type: &str, date: &str, venue_ids: &[&str]) -> Value {
    json!({
        "name": name,
        "sport_type": sport_type,
        "event_date": date,
        "description": "Open to the public",
        "venue_ids": venue_ids,
    })
}
