#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use annynotes::app::{app, AppState};
use annynotes::config::{AppConfig, Environment, PasswordCost, SigningSecret};
use annynotes::database::{SqliteStorage, Storage};

pub const SECRET: &str = "integration-test-secret";

/// The real router over a private in-memory database
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let storage = SqliteStorage::in_memory().await?;
        Self::with_storage(Arc::new(storage), tweak)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, tweak: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::preset(Environment::Development, SigningSecret::new(SECRET)?);
        config.security.password = PasswordCost::MINIMAL;
        tweak(&mut config);

        let state = AppState::new(&config, storage);
        let router = app(&config, state.clone());
        Ok(Self { router, state })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Response { status, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<Response> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Result<Response> {
        self.send(request(method, uri, token, Some(body.to_string()))).await
    }

    /// Registers a user and returns `(token, user id)`
    pub async fn register(&self, username: &str) -> Result<(String, String)> {
        let res = self
            .json(
                Method::POST,
                "/users",
                None,
                json!({
                    "email": format!("{}@shire.me", username),
                    "name": "Hobbit",
                    "username": username,
                    "password": "second-breakfast"
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {} {}", res.status, res.body);

        let token = res.body["data"]["token"].as_str().unwrap_or_default().to_string();
        let id = res.body["data"]["user"]["id"].as_str().unwrap_or_default().to_string();
        Ok((token, id))
    }

    /// Creates a note as the token's owner and returns its id
    pub async fn create_note(&self, token: &str, author: &str) -> Result<String> {
        let res = self
            .json(
                Method::POST,
                "/notes",
                Some(token),
                json!({"author": author, "message": "Let the adventure begin..."}),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {} {}", res.status, res.body);
        Ok(res.body["data"]["id"].as_str().unwrap_or_default().to_string())
    }
}

/// JSON request with an optional bearer token
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body)
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

/// Raw request for decoder edge cases
pub fn raw(method: Method, uri: &str, token: Option<&str>, content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body.into()).expect("valid request")
}
