use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SigningSecret;
use crate::types::Identifier;

/// Lifetime of every issued token. Clients re-authenticate instead of refreshing.
pub const TOKEN_TTL_SECONDS: i64 = 5 * 60;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Identity payload embedded in a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Why a presented bearer token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authorization token is required")]
    Missing,

    #[error("invalid authorization token: expected format \"Authorization: Bearer <token>\"")]
    Malformed,

    #[error("token is expired")]
    Expired,

    #[error("malformed token: token contains invalid claims")]
    InvalidClaims,

    #[error("token signature is invalid")]
    InvalidSignature,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to sign token: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

/// Issues and validates HS256 bearer tokens with a key fixed at construction.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: &Identifier, email: &str) -> Result<String, IssueError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issues a token as if the current time were `issued_at`.
    pub fn issue_at(&self, user_id: &Identifier, email: &str, issued_at: DateTime<Utc>) -> Result<String, IssueError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            expires_at: (issued_at + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
        };
        Ok(encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?)
    }

    /// Validates the raw value of an `Authorization` header.
    pub fn validate(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let header = match authorization {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::Missing),
        };

        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") || parts[1].is_empty() {
            return Err(AuthError::Malformed);
        }

        self.validate_token(parts[1])
    }

    /// Validates a compact token with no scheme prefix.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        // Only HS256 is accepted; anything else (including "none") is refused before verification
        match decode_header(token) {
            Ok(header) if header.alg == ALGORITHM => {}
            _ => return Err(AuthError::InvalidSignature),
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
                _ => AuthError::InvalidSignature,
            })
    }
}
