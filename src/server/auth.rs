//! API key authentication.
//!
//! Every request must present the server's API key, either as the `apiKey`
//! form field or in the `x-api-key` header for raw image uploads. Keys are
//! compared in constant time.
//!
//! A server started without a key rejects every request with 500 rather than
//! silently accepting uploads.
//!
//! # Example
//!
//! ```rust
//! use lqip_server::server::auth::ApiKeyAuth;
//!
//! let auth = ApiKeyAuth::new("my-secret-key");
//! assert!(auth.verify(Some("my-secret-key")).is_ok());
//! assert!(auth.verify(Some("wrong")).is_err());
//! assert!(auth.verify(None).is_err());
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use super::handlers::ErrorResponse;

/// Header carrying the API key for raw image uploads.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Form field carrying the API key for form uploads.
pub const API_KEY_FIELD: &str = "apiKey";

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The server has no API key configured
    NotConfigured,

    /// The request carries no API key
    MissingApiKey,

    /// The request's API key does not match
    InvalidApiKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NotConfigured => write!(f, "App not set up correctly"),
            AuthError::MissingApiKey | AuthError::InvalidApiKey => write!(f, "Invalid API Key"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::NotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "not_configured"),
            AuthError::MissingApiKey | AuthError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "invalid_api_key")
            }
        };
        let message = self.to_string();

        // A wrong key could be someone probing, a missing key is usually a
        // misconfigured client
        match &self {
            AuthError::NotConfigured => {
                error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Server has no API key configured"
                );
            }
            AuthError::InvalidApiKey => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: API key mismatch"
                );
            }
            AuthError::MissingApiKey => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: no API key"
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// API Key Authentication
// =============================================================================

/// API key authenticator.
#[derive(Clone)]
pub struct ApiKeyAuth {
    /// The server's key; `None` when the server is misconfigured
    api_key: Option<Vec<u8>>,
}

impl ApiKeyAuth {
    /// Create an authenticator expecting `api_key`.
    ///
    /// An empty key counts as not configured.
    pub fn new(api_key: impl AsRef<[u8]>) -> Self {
        let api_key = api_key.as_ref();
        Self {
            api_key: (!api_key.is_empty()).then(|| api_key.to_vec()),
        }
    }

    /// Create an authenticator for a server without a key.
    ///
    /// Every request will be rejected with [`AuthError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self { api_key: None }
    }

    /// Create an authenticator from an optional configured key.
    pub fn from_config(api_key: Option<&str>) -> Self {
        api_key.map_or_else(Self::unconfigured, Self::new)
    }

    /// Whether a server key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fail with [`AuthError::NotConfigured`] if the server has no key.
    pub fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(AuthError::NotConfigured)
        }
    }

    /// Verify a client-provided key.
    ///
    /// Empty keys are treated as missing.
    pub fn verify(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let expected = self.api_key.as_deref().ok_or(AuthError::NotConfigured)?;

        let provided = match provided {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AuthError::MissingApiKey),
        };

        if bool::from(provided.as_bytes().ct_eq(expected)) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("configured", &self.is_configured())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
