//! Placeholder generation layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handler               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              LqipService                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  LqipCache   │  │   in-flight     │  │
//! │  │  (LRU memo)  │  │  (singleflight) │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ spawn_blocking
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          compute_lqip_image             │
//! │  decode → orient → resize → encode      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`compute_lqip_image`]: The reduction itself, synchronous and in-memory
//! - [`LqipOptions`]: Resize target, output format, encoder overrides
//! - [`LqipCache`]: Bounded LRU memo of finished reductions
//! - [`LqipService`]: Memoized, single-flight entry point used by the server
//!
//! # Example
//!
//! ```
//! use lqip_server::lqip::{compute_lqip_image, LqipOptions, OutputFormat};
//! use image::{DynamicImage, ImageFormat, RgbImage};
//! use std::io::Cursor;
//!
//! let mut png = Cursor::new(Vec::new());
//! DynamicImage::ImageRgb8(RgbImage::new(64, 32))
//!     .write_to(&mut png, ImageFormat::Png)
//!     .unwrap();
//!
//! let options = LqipOptions::default().with_format(OutputFormat::Jpeg);
//! let lqip = compute_lqip_image(png.get_ref(), &options).unwrap();
//!
//! assert_eq!((lqip.metadata.width, lqip.metadata.height), (16, 8));
//! assert!(lqip.metadata.data_uri_base64.starts_with("data:image/jpeg;base64,"));
//! ```

mod cache;
mod options;
mod reducer;
mod service;

pub use cache::{LqipCache, DEFAULT_LQIP_CACHE_ENTRIES};
pub use options::{
    EncoderOverrides, LqipOptions, OutputFormat, Resize, DEFAULT_ALPHA_QUALITY, DEFAULT_QUALITY,
    DEFAULT_RESIZE,
};
pub use reducer::{compute_lqip_image, data_uri, LqipImage, LqipMetadata};
pub use service::{content_key, LqipService, Reduction};
