// handlers/public/users.rs - POST /users (register) and POST /users/auth (login)

use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::StrictJson;
use crate::app::AppState;
use crate::auth::{PasswordVault, TOKEN_TTL_SECONDS};
use crate::database::{AuthenticatedUser, NewUser, StorageError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Identifier;

const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=20;
const MIN_PASSWORD_LEN: usize = 8;
const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: AuthenticatedUser,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
}

/**
 * POST /users - Create an account and receive a bearer token
 *
 * Input: `{"email", "name", "username", "password"}`. Email is stored
 * lowercased; duplicates of email or username answer 409.
 */
pub async fn register(
    State(state): State<AppState>,
    StrictJson(body): StrictJson<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let field_errors = body.field_errors();
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid registration", Some(field_errors)));
    }

    let password_hash = hash_off_thread(state.passwords, body.password).await?;

    let user = state
        .storage
        .create_user(NewUser {
            id: Identifier::generate(),
            email: body.email.trim().to_lowercase(),
            name: body.name.trim().to_string(),
            username: body.username.trim().to_string(),
            password_hash,
        })
        .await?;

    let token = state.tokens.issue(&user.id, &user.email)?;
    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::created(RegisterResponse {
        token,
        user: user.into(),
        expires_in: TOKEN_TTL_SECONDS,
    }))
}

/// POST /users/auth - exchange email and password for a bearer token
pub async fn login(State(state): State<AppState>, StrictJson(body): StrictJson<LoginRequest>) -> ApiResult<LoginResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        let mut fields = HashMap::new();
        for (field, value) in [("email", body.email.trim()), ("password", body.password.as_str())] {
            if value.is_empty() {
                fields.insert(field.to_string(), "This field is required".to_string());
            }
        }
        return Err(ApiError::validation_error("Missing required fields", Some(fields)));
    }

    // Unknown email and wrong password are indistinguishable to the caller,
    // in the response and in how long the response takes
    let user = match state.storage.fetch_user_by_email(&body.email.trim().to_lowercase()).await {
        Ok(user) => Some(user),
        Err(StorageError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let hashed = user.as_ref().map(|u| u.password.clone());
    let verified = verify_off_thread(state.passwords, hashed, body.password).await?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            tracing::warn!("Wrong password for user {}", user.id);
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        None => {
            tracing::warn!("Login attempt for unknown email");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let token = state.tokens.issue(&user.id, &user.email)?;
    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: TOKEN_TTL_SECONDS,
    }))
}

impl RegisterRequest {
    fn field_errors(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        if !looks_like_email(self.email.trim()) {
            errors.insert("email".to_string(), "Must be a valid email address".to_string());
        }
        for (field, value) in [("name", &self.name), ("username", &self.username)] {
            if !NAME_LEN.contains(&value.trim().chars().count()) {
                errors.insert(field.to_string(), "Must be between 2 and 20 characters".to_string());
            }
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password".to_string(), "Must be at least 8 characters".to_string());
        }

        errors
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

// Argon2 is deliberately slow; keep it off the async workers
async fn hash_off_thread(vault: PasswordVault, secret: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || vault.hash(&secret))
        .await
        .map_err(join_failure)?
        .map_err(ApiError::from)
}

// `None` means no such account; the same work is done either way
async fn verify_off_thread(vault: PasswordVault, hashed: Option<String>, candidate: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match hashed {
        Some(hashed) => vault.verify(&hashed, &candidate),
        None => vault.verify_absent(&candidate),
    })
        .await
        .map_err(join_failure)
}

fn join_failure(err: tokio::task::JoinError) -> ApiError {
    tracing::error!("Password task failed: {}", err);
    ApiError::internal_server_error("An error occurred while processing your request")
}
