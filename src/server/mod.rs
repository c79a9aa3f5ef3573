//! HTTP server layer for the LQIP service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                            POST /                               │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (API key)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{ApiKeyAuth, AuthError, API_KEY_FIELD, API_KEY_HEADER};
pub use handlers::{
    lqip_handler, AppState, ErrorResponse, RequestShape, CACHE_HIT_HEADER, HTTP_RESIZE,
    OUTPUT_FORMAT_HEADER,
};
pub use routes::{
    create_router, create_router_with_shared_service, RouterConfig, DEFAULT_MAX_BODY_BYTES,
};
