use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::Identifier;

/// Stored user row. `password` holds the PHC hash, never the secret.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Identifier,
    pub email: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Identifier,
    pub email: String,
    pub name: String,
    pub username: String,
    pub password_hash: String,
}

/// The user resolved by the authorization gate; safe to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: Identifier,
    pub email: String,
    pub name: String,
    pub username: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            username: user.username,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}
