use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AuthSettings;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::ArcBackend;
use crate::error::ApiError;
use crate::handlers;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub backend: ArcBackend,
    pub auth: Arc<AuthSettings>,
    pub action_timeout: Option<Duration>,
    pub venue_search_limit: i64,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(backend: ArcBackend, config: &AppConfig) -> Self {
        Self {
            backend,
            auth: AuthSettings::from_config(config),
            action_timeout: config.action_timeout(),
            venue_search_limit: config.api.venue_search_limit,
            cookie_secure: config.security.cookie_secure,
        }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .route("/api/sports", get(handlers::system::sports))
        .merge(auth_routes())
        .merge(event_routes())
        .merge(venue_routes())
        .fallback(|| async { ApiError::not_found("Route not found") })
        .with_state(state);

    let router = match cors_layer(&config.security) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/me", get(auth::me))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/resend-verification", post(auth::resend_verification))
}

fn event_routes() -> Router<AppState> {
    use handlers::events;

    Router::new()
        .route("/api/events", get(events::list).post(events::create))
        // Static segment is matched before the :id capture
        .route("/api/events/mine", get(events::mine))
        .route(
            "/api/events/:id",
            get(events::show).put(events::update).delete(events::remove),
        )
}

fn venue_routes() -> Router<AppState> {
    use handlers::venues;

    Router::new()
        .route("/api/venues", get(venues::list).post(venues::create))
        .route("/api/venues/search", get(venues::search))
        .route("/api/venues/:id", get(venues::show))
}

/// Credentialed CORS for the configured origins; `*` opens it up entirely
pub fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}
