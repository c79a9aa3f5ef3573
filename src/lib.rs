//! # LQIP Server
//!
//! An HTTP service that turns uploaded images into low quality image
//! placeholders (LQIP): tiny, heavily compressed previews a web page can show
//! while the full image loads.
//!
//! ## Features
//!
//! - **Two input encodings**: form uploads (multipart or url-encoded) and raw
//!   `image/*` bodies
//! - **Two output shapes**: raw placeholder bytes, or JSON metadata with a
//!   base64 data URI
//! - **EXIF-aware**: images are rotated to their display orientation first
//! - **Memoized**: results are kept in a bounded LRU, and concurrent requests
//!   for the same image share one reduction
//! - **Authentication**: a shared API key, compared in constant time
//!
//! ## Architecture
//!
//! - [`lqip`] - Reduction pipeline, memo cache and service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use lqip_server::{create_router, LqipService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let router = create_router(
//!         LqipService::with_cache_capacity(1024),
//!         RouterConfig::new("my-api-key"),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod lqip;
pub mod server;

// Re-export commonly used types
pub use config::{Cli, Command, ReduceConfig, ServeConfig};
pub use error::{LqipError, RequestError};
pub use lqip::{
    compute_lqip_image, content_key, data_uri, EncoderOverrides, LqipCache, LqipImage,
    LqipMetadata, LqipOptions, LqipService, OutputFormat, Reduction, Resize,
};
pub use server::{
    create_router, create_router_with_shared_service, lqip_handler, ApiKeyAuth, AppState,
    AuthError, ErrorResponse, RouterConfig,
};
