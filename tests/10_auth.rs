mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use annynotes::database::{
    NewNote, NewUser, Note, NoteChanges, SqliteStorage, Storage, StorageError, User,
};
use annynotes::types::Identifier;
use common::TestApp;

/// Storage that counts every call before delegating
struct CountingStorage {
    inner: SqliteStorage,
    calls: AtomicUsize,
}

impl CountingStorage {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for CountingStorage {
    async fn list_notes(&self) -> Result<Vec<Note>, StorageError> {
        self.hit();
        self.inner.list_notes().await
    }
    async fn list_notes_by_author(&self, author: &str) -> Result<Vec<Note>, StorageError> {
        self.hit();
        self.inner.list_notes_by_author(author).await
    }
    async fn fetch_note_by_id(&self, id: &Identifier) -> Result<Note, StorageError> {
        self.hit();
        self.inner.fetch_note_by_id(id).await
    }
    async fn create_note(&self, note: NewNote) -> Result<Note, StorageError> {
        self.hit();
        self.inner.create_note(note).await
    }
    async fn update_note(&self, id: &Identifier, changes: NoteChanges) -> Result<Note, StorageError> {
        self.hit();
        self.inner.update_note(id, changes).await
    }
    async fn delete_note(&self, id: &Identifier) -> Result<(), StorageError> {
        self.hit();
        self.inner.delete_note(id).await
    }
    async fn fetch_user_by_email(&self, email: &str) -> Result<User, StorageError> {
        self.hit();
        self.inner.fetch_user_by_email(email).await
    }
    async fn fetch_user_by_id(&self, id: &Identifier) -> Result<User, StorageError> {
        self.hit();
        self.inner.fetch_user_by_id(id).await
    }
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        self.hit();
        self.inner.create_user(user).await
    }
    async fn health_check(&self) -> Result<(), StorageError> {
        self.hit();
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::spawn().await?;
    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn health_reports_unavailable_database() -> Result<()> {
    let storage = SqliteStorage::in_memory().await?;
    let app = TestApp::with_storage(Arc::new(storage.clone()), |_| {})?;
    storage.close().await;

    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["error"], true);
    assert_eq!(res.body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(res.body["message"], "database unavailable");
    Ok(())
}

#[tokio::test]
async fn register_returns_token_and_public_user() -> Result<()> {
    let app = TestApp::spawn().await?;
    let res = app
        .json(
            Method::POST,
            "/users",
            None,
            json!({"email": "Bilbo@Shire.me", "name": "Bilbo", "username": "bilbo", "password": "precious-ring"}),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    let data = &res.body["data"];
    assert!(data["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(data["user"]["email"], "bilbo@shire.me");
    assert_eq!(data["expires_in"], 300);
    assert!(Identifier::validate(data["user"]["id"].as_str().unwrap_or_default()));
    assert!(data["user"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn register_rejects_invalid_fields_and_duplicates() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .json(
            Method::POST,
            "/users",
            None,
            json!({"email": "nope", "name": "B", "username": "bilbo", "password": "short"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(res.body["field_errors"]["email"].is_string());
    assert!(res.body["field_errors"]["password"].is_string());

    app.register("bilbo").await?;
    let res = app
        .json(
            Method::POST,
            "/users",
            None,
            json!({"email": "bilbo@shire.me", "name": "Bilbo", "username": "bilbo2", "password": "precious-ring"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn login_issues_token_and_hides_which_credential_failed() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.register("frodo").await?;

    let ok = app
        .json(Method::POST, "/users/auth", None, json!({"email": "frodo@shire.me", "password": "second-breakfast"}))
        .await?;
    assert_eq!(ok.status, StatusCode::OK);
    let token = ok.body["data"]["token"].as_str().unwrap_or_default().to_string();

    let me = app.get("/users/me", Some(&token)).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["username"], "frodo");

    let wrong_password = app
        .json(Method::POST, "/users/auth", None, json!({"email": "frodo@shire.me", "password": "elevenses!"}))
        .await?;
    let unknown_email = app
        .json(Method::POST, "/users/auth", None, json!({"email": "sauron@mordor.me", "password": "second-breakfast"}))
        .await?;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["message"], unknown_email.body["message"]);
    Ok(())
}

#[tokio::test]
async fn gate_rejects_without_touching_storage() -> Result<()> {
    let storage = Arc::new(CountingStorage {
        inner: SqliteStorage::in_memory().await?,
        calls: AtomicUsize::new(0),
    });
    let app = TestApp::with_storage(storage.clone(), |_| {})?;

    let body = json!({"author": "Bilbo Baggins", "message": "hello"});
    let missing = app.json(Method::POST, "/notes", None, body.clone()).await?;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "authorization token is required");

    let malformed = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/notes")
                .header(header::AUTHORIZATION, "Token abc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.to_string().into())?,
        )
        .await?;
    assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);

    let garbage = app.json(Method::POST, "/notes", Some("not.a.jwt"), body).await?;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    assert_eq!(storage.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, id) = app.register("merry").await?;
    let id = Identifier::parse(&id)?;

    let stale = app
        .state
        .tokens
        .issue_at(&id, "merry@shire.me", Utc::now() - Duration::minutes(10))?;
    let res = app.get("/users/me", Some(&stale)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "token is expired");
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_not_found() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.state.tokens.issue(&Identifier::generate(), "ghost@barrow.downs")?;
    let res = app.get("/users/me", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn token_from_another_key_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, id) = app.register("pippin").await?;

    let other = TestApp::spawn_with(|config| {
        config.security.signing_secret = annynotes::config::SigningSecret::new("a-different-secret").unwrap();
    })
    .await?;
    let forged = other.state.tokens.issue(&Identifier::parse(&id)?, "pippin@shire.me")?;

    let res = app.get("/users/me", Some(&forged)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
