use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRef, FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::config::DEFAULT_MAX_REQUEST_SIZE_BYTES;
use crate::error::ApiError;

/// Classified failure of strict JSON body decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Content-Type header is required and must be application/json")]
    MissingContentType,

    #[error("{message}")]
    BadContentType { status: StatusCode, message: String },

    #[error("Request body contains badly-formed JSON (at position {offset})")]
    SyntaxError { offset: usize },

    #[error("Request body contains an invalid value for the {field:?} field (at position {offset})")]
    TypeMismatch { field: String, offset: usize },

    #[error("Request body contains unknown field {field:?}")]
    UnknownField { field: String },

    #[error("Request body must not be empty")]
    Empty,

    #[error("Request body must not be larger than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Request body must only contain a single JSON object")]
    MultipleObjects,
}

impl DecodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DecodeError::BadContentType { status, .. } => *status,
            DecodeError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BodyReadError {
    #[error("body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to read request body: {0}")]
    Transport(#[from] axum::Error),
}

/// Maximum accepted body size, resolved from application state
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_body_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_REQUEST_SIZE_BYTES,
        }
    }
}

/// Extractor that decodes exactly one JSON object into `T`.
///
/// Destination types are expected to carry `#[serde(deny_unknown_fields)]`;
/// that is what makes the decoding closed-world.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    DecodeLimits: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limits = DecodeLimits::from_ref(state);
        let (parts, body) = req.into_parts();

        check_content_type(&parts.headers)?;

        let bytes = read_body(body, limits.max_body_bytes).await.map_err(|e| match e {
            BodyReadError::TooLarge(limit) => ApiError::from(DecodeError::TooLarge { limit }),
            BodyReadError::Transport(err) => {
                tracing::error!("Failed to read request body: {}", err);
                ApiError::internal_server_error("Failed to read request body")
            }
        })?;

        Ok(StrictJson(decode_slice(&bytes)?))
    }
}

/// Requires a well-formed `Content-Type` whose media type is exactly `application/json`.
/// Parameters such as `charset` are ignored.
pub fn check_content_type(headers: &HeaderMap) -> Result<(), DecodeError> {
    let value = headers.get(CONTENT_TYPE).ok_or(DecodeError::MissingContentType)?;

    let malformed = || DecodeError::BadContentType {
        status: StatusCode::BAD_REQUEST,
        message: "Content-Type header is malformed".to_string(),
    };

    let raw = value.to_str().map_err(|_| malformed())?;
    let media_type = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

    match media_type.split_once('/') {
        Some((kind, subtype)) if is_token(kind) && is_token(subtype) => {}
        _ => return Err(malformed()),
    }

    if media_type != "application/json" {
        return Err(DecodeError::BadContentType {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Content-Type header is not application/json".to_string(),
        });
    }

    Ok(())
}

// RFC 9110 token characters
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Buffers the body, refusing to hold more than `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, BodyReadError> {
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(BodyReadError::TooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

/// Decodes exactly one JSON value from `body` into `T`.
pub fn decode_slice<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    if body.iter().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
        return Err(DecodeError::Empty);
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let value: T = serde_path_to_error::deserialize(&mut de).map_err(|e| classify(e, body))?;

    // Only whitespace may follow the first value
    de.end().map_err(|_| DecodeError::MultipleObjects)?;

    Ok(value)
}

fn classify(err: serde_path_to_error::Error<serde_json::Error>, body: &[u8]) -> DecodeError {
    let path = err.path().to_string();
    let inner = err.into_inner();
    let offset = byte_offset(body, inner.line(), inner.column());

    match inner.classify() {
        Category::Data => {
            let message = inner.to_string();
            if let Some(field) = quoted_after(&message, "unknown field `") {
                DecodeError::UnknownField { field: qualify(&path, field) }
            } else if let Some(field) = quoted_after(&message, "missing field `")
                .or_else(|| quoted_after(&message, "duplicate field `"))
            {
                DecodeError::TypeMismatch { field: qualify(&path, field), offset }
            } else {
                DecodeError::TypeMismatch { field: path, offset }
            }
        }
        Category::Syntax | Category::Eof | Category::Io => DecodeError::SyntaxError { offset },
    }
}

fn quoted_after<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    message.strip_prefix(prefix)?.split('`').next()
}

fn qualify(path: &str, field: &str) -> String {
    if path == "." || path == field {
        field.to_string()
    } else if path.ends_with(&format!(".{}", field)) {
        path.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

/// Converts serde_json's 1-based line / byte column into an offset into `body`.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        body.iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)
            .unwrap_or(body.len())
    };
    (line_start + column).min(body.len())
}
