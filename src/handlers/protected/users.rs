// handlers/protected/users.rs - GET /users/me handler

use axum::Extension;

use crate::database::AuthenticatedUser;
use crate::middleware::{ApiResponse, ApiResult};

/// The user the bearer token resolved to
pub async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> ApiResult<AuthenticatedUser> {
    Ok(ApiResponse::success(user))
}
