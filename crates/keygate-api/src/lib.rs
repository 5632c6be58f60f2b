//! Keygate API - user registration and authentication service
//!
//! Provides HTTP endpoints for registering identities, exchanging
//! credentials for session tokens and checking those tokens.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod photo;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Keygate API",
        description = "User registration, authentication and session tokens"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::check_token_handler,
        handlers::auth::me_handler,
        handlers::verify::verify_photo_handler,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::auth::CredentialsRequest,
        handlers::auth::TokenResponse,
        handlers::auth::TokenInfoResponse,
        handlers::verify::MessageResponse,
        handlers::verify::PhotoUpload,
        auth::AuthenticatedUser,
        error::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "users", description = "Registration, login and tokens")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the application router over shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_size;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz/live", get(handlers::health_check))
        .route("/healthz/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .merge(routes::user_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Create a router backed by in-memory collaborators
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    testing::TestContext::new().router()
}

/// In-memory wiring for unit and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use crate::auth::{PasswordConfig, TokenCodec};
    use crate::photo::RecordingPublisher;
    use crate::state::AppState;
    use axum::Router;
    use jsonwebtoken::Algorithm;
    use keygate_cache::MemoryTokenCache;
    use keygate_core::config::{AppConfig, CacheBackend, StoreBackend};
    use keygate_core::{Clock, ManualClock, MemoryUserDirectory};
    use std::sync::Arc;

    pub const PRIVATE_PEM: &[u8] = include_bytes!("../tests/fixtures/jwt_private.pem");
    pub const PUBLIC_PEM: &[u8] = include_bytes!("../tests/fixtures/jwt_public.pem");

    /// RS256 codec over the checked-in fixture key pair
    pub fn fixture_codec(clock: Arc<dyn Clock>, ttl_secs: u64) -> TokenCodec {
        TokenCodec::from_pem(PRIVATE_PEM, PUBLIC_PEM, Algorithm::RS256, ttl_secs, clock)
            .expect("fixture keys are valid")
    }

    /// Application state plus handles the tests drive directly
    pub struct TestContext {
        pub state: Arc<AppState>,
        pub clock: Arc<ManualClock>,
        pub directory: Arc<MemoryUserDirectory>,
        pub cache: Arc<MemoryTokenCache>,
        pub publisher: Arc<RecordingPublisher>,
        pub photo_dir: tempfile::TempDir,
    }

    impl TestContext {
        pub fn new() -> Self {
            let photo_dir = tempfile::tempdir().expect("create photo dir");

            let mut config = AppConfig::default();
            config.database.backend = StoreBackend::Memory;
            config.cache.backend = CacheBackend::Memory;
            config.photo.storage_dir = photo_dir.path().to_path_buf();

            let clock = Arc::new(ManualClock::starting_now());
            let directory = Arc::new(MemoryUserDirectory::new());
            let cache = Arc::new(MemoryTokenCache::new());
            let publisher = Arc::new(RecordingPublisher::default());
            let codec = fixture_codec(clock.clone(), config.jwt.ttl_secs());

            let state = AppState::new(
                config,
                directory.clone(),
                cache.clone(),
                codec,
                PasswordConfig::lightweight(),
                publisher.clone(),
            )
            .expect("build test state");

            Self {
                state: Arc::new(state),
                clock,
                directory,
                cache,
                publisher,
                photo_dir,
            }
        }

        pub fn router(&self) -> Router {
            crate::create_router(self.state.clone())
        }
    }

    impl Default for TestContext {
        fn default() -> Self {
            Self::new()
        }
    }
}
