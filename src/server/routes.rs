//! Router configuration for the LQIP server.
//!
//! # Route Structure
//!
//! ```text
//! POST /    - Reduce an uploaded image (API key required)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lqip_server::lqip::LqipService;
//! use lqip_server::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new("my-api-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(LqipService::new(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{ApiKeyAuth, API_KEY_HEADER};
use super::handlers::{lqip_handler, AppState, OUTPUT_FORMAT_HEADER};
use crate::lqip::LqipService;

/// Default maximum request body size (25 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// The server's API key (None = misconfigured, every request gets 500)
    pub api_key: Option<String>,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given API key.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Bodies up to 25 MiB are accepted
    /// - Tracing is enabled
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::without_api_key()
        }
    }

    /// Create a configuration with no API key.
    ///
    /// The router still serves, but rejects every request with 500.
    pub fn without_api_key() -> Self {
        Self {
            api_key: None,
            cors_origins: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the maximum request body size in bytes.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// This function builds the Axum router with:
/// - The `POST /` placeholder route
/// - A request body limit
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router(lqip_service: LqipService, config: RouterConfig) -> Router {
    create_router_with_shared_service(Arc::new(lqip_service), config)
}

/// Create the application router around an existing service.
///
/// Useful when the caller also needs the service (e.g. to inspect its cache).
pub fn create_router_with_shared_service(
    lqip_service: Arc<LqipService>,
    config: RouterConfig,
) -> Router {
    let auth = ApiKeyAuth::from_config(config.api_key.as_deref());
    let app_state = AppState::with_shared_service(lqip_service, auth);

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/", post(lqip_handler))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(OUTPUT_FORMAT_HEADER),
        ])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
