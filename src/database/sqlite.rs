use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{NewNote, NewUser, Note, NoteChanges, Storage, StorageError, User};
use crate::config::DatabaseConfig;
use crate::types::Identifier;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id TEXT NOT NULL PRIMARY KEY,
      email TEXT NOT NULL UNIQUE,
      name TEXT NOT NULL CHECK(length(name) >= 2 AND length(name) <= 20),
      username TEXT NOT NULL UNIQUE CHECK(length(username) >= 2 AND length(username) <= 20),
      password TEXT NOT NULL,
      verified INTEGER NOT NULL DEFAULT 0,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notes (
      id TEXT NOT NULL PRIMARY KEY,
      author TEXT NOT NULL,
      message TEXT NOT NULL,
      user_id TEXT NOT NULL REFERENCES users(id),
      verified INTEGER NOT NULL DEFAULT 0,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS notes_author_idx ON notes(author COLLATE NOCASE)",
];

const NOTE_COLUMNS: &str = "id, author, message, user_id, verified, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, name, username, password, verified, created_at, updated_at";

/// SQLite-backed [`Storage`]
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `config.url` and ensures the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        if config.url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.setup().await?;
        info!("Connected to database: {}", config.url);
        Ok(storage)
    }

    /// Private in-memory database. Pinned to one connection that is never
    /// recycled, since every SQLite memory connection is a separate database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.setup().await?;
        Ok(storage)
    }

    async fn setup(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

fn not_found(what: &str, id: &Identifier) -> StorageError {
    StorageError::NotFound(format!("{} '{}' not found", what, id))
}

// Unique violations become conflicts; everything else stays opaque
fn map_insert_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            let conflict = if message.contains("users.email") {
                "email is already registered"
            } else if message.contains("users.username") {
                "username is already taken"
            } else {
                "record already exists"
            };
            return StorageError::Conflict(conflict.to_string());
        }
    }
    StorageError::Sqlx(err)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn list_notes(&self) -> Result<Vec<Note>, StorageError> {
        let sql = format!("SELECT {} FROM notes ORDER BY created_at DESC, rowid DESC", NOTE_COLUMNS);
        Ok(sqlx::query_as::<_, Note>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_notes_by_author(&self, author: &str) -> Result<Vec<Note>, StorageError> {
        let sql = format!(
            "SELECT {} FROM notes WHERE author = ?1 COLLATE NOCASE ORDER BY created_at DESC, rowid DESC",
            NOTE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Note>(&sql).bind(author).fetch_all(&self.pool).await?)
    }

    async fn fetch_note_by_id(&self, id: &Identifier) -> Result<Note, StorageError> {
        let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("note", id))
    }

    async fn create_note(&self, note: NewNote) -> Result<Note, StorageError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO notes (id, author, message, user_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING {}",
            NOTE_COLUMNS
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(&note.id)
            .bind(&note.author)
            .bind(&note.message)
            .bind(&note.user_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn update_note(&self, id: &Identifier, changes: NoteChanges) -> Result<Note, StorageError> {
        let sql = format!(
            "UPDATE notes SET author = COALESCE(?1, author), message = COALESCE(?2, message), updated_at = ?3 \
             WHERE id = ?4 RETURNING {}",
            NOTE_COLUMNS
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(changes.author)
            .bind(changes.message)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("note", id))
    }

    async fn delete_note(&self, id: &Identifier) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("note", id));
        }
        Ok(())
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<User, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound("user not found".to_string()))
    }

    async fn fetch_user_by_id(&self, id: &Identifier) -> Result<User, StorageError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("user", id))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (id, email, name, username, password, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
