use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::AuthError;
use crate::database::{AuthenticatedUser, StorageError};
use crate::error::ApiError;
use crate::types::Identifier;

/// Authorization gate for protected routes.
///
/// Validates the bearer token, resolves the user it names from storage by ID,
/// and makes the result available to the wrapped handler as
/// `Extension<AuthenticatedUser>`. On any failure the handler is not invoked:
/// token problems answer 401, an unknown user 404, a storage fault 500.
pub async fn authorization_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| reject(AuthError::Malformed))?),
        None => None,
    };

    let claims = state.tokens.validate(header).map_err(reject)?;

    // A well-signed token with a malformed subject is still a claims problem
    let user_id = Identifier::parse(&claims.user_id).map_err(|_| reject(AuthError::InvalidClaims))?;

    let user = state.storage.fetch_user_by_id(&user_id).await.map_err(|e| match e {
        StorageError::NotFound(_) => {
            tracing::warn!("Token subject {} no longer exists", user_id);
            ApiError::not_found("user not found")
        }
        other => other.into(),
    })?;

    tracing::debug!("Authenticated user {}", user.id);
    request.extensions_mut().insert(AuthenticatedUser::from(user));

    Ok(next.run(request).await)
}

fn reject(err: AuthError) -> ApiError {
    tracing::warn!("Rejected bearer token: {:?}", err);
    err.into()
}
