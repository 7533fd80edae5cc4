use axum::{
    extract::FromRef,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::api::DecodeLimits;
use crate::auth::{PasswordVault, TokenService};
use crate::config::AppConfig;
use crate::database::Storage;
use crate::handlers::{protected, public};
use crate::middleware::authorization_gate;

/// Shared, read-only per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordVault,
    pub limits: DecodeLimits,
}

impl AppState {
    pub fn new(config: &AppConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            tokens: Arc::new(TokenService::new(&config.security.signing_secret)),
            passwords: PasswordVault::new(config.security.password),
            limits: DecodeLimits {
                max_body_bytes: config.api.max_request_size_bytes,
            },
        }
    }
}

impl FromRef<AppState> for DecodeLimits {
    fn from_ref(state: &AppState) -> Self {
        state.limits
    }
}

/// Full application: routes plus CORS and request tracing
pub fn app(config: &AppConfig, state: AppState) -> Router {
    router(state)
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(note_routes(&state))
        .merge(user_routes(&state))
        .with_state(state)
}

fn note_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/notes", get(public::notes::list))
        .route("/notes/:id", get(public::notes::show));

    let protected = Router::new()
        .route("/notes", post(protected::notes::create))
        .route(
            "/notes/:id",
            put(protected::notes::replace)
                .patch(protected::notes::update)
                .delete(protected::notes::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), authorization_gate));

    public.merge(protected)
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/users", post(public::users::register))
        .route("/users/auth", post(public::users::login));

    let protected = Router::new()
        .route("/users/me", get(protected::users::whoami))
        .route_layer(from_fn_with_state(state.clone(), authorization_gate));

    public.merge(protected)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
