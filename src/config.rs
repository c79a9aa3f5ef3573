//! Configuration management for the LQIP server.
//!
//! The binary has two subcommands:
//! - `serve`: run the HTTP service
//! - `reduce`: compute one placeholder from a local file
//!
//! # Environment Variables
//!
//! Every `serve` option can also be set from the environment:
//!
//! - `API_KEY` - The API key clients must present (no default)
//! - `LQIP_HOST` - Server bind address (default: 0.0.0.0)
//! - `LQIP_PORT` - Server port (default: 3000)
//! - `LQIP_CACHE_ENTRIES` - Max memoized placeholders (default: 1024)
//! - `LQIP_MAX_BODY_BYTES` - Max request body size (default: 25 MiB)
//! - `LQIP_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::lqip::{
    EncoderOverrides, LqipOptions, OutputFormat, Resize, DEFAULT_LQIP_CACHE_ENTRIES,
    DEFAULT_RESIZE,
};
use crate::server::{RouterConfig, DEFAULT_MAX_BODY_BYTES};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Smallest accepted body limit.
pub const MIN_MAX_BODY_BYTES: usize = 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// LQIP Server - Low quality image placeholders over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "lqip-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Reduce a local image file and print its placeholder metadata.
    Reduce(ReduceConfig),
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "LQIP_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "LQIP_PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// API key clients must send (form field `apiKey` or header `x-api-key`).
    ///
    /// The server starts without one, but then rejects every request.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // =========================================================================
    // Limits
    // =========================================================================
    /// Maximum number of placeholders to memoize.
    #[arg(long, default_value_t = DEFAULT_LQIP_CACHE_ENTRIES, env = "LQIP_CACHE_ENTRIES")]
    pub cache_entries: usize,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "LQIP_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "LQIP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_entries == 0 {
            return Err("cache_entries must be greater than 0".to_string());
        }

        if self.max_body_bytes < MIN_MAX_BODY_BYTES {
            return Err(format!(
                "max_body_bytes must be at least {} bytes",
                MIN_MAX_BODY_BYTES
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Build the router configuration for these settings.
    pub fn router_config(&self) -> RouterConfig {
        let mut router_config = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => RouterConfig::new(key),
            _ => RouterConfig::without_api_key(),
        };

        if let Some(ref origins) = self.cors_origins {
            router_config = router_config.with_cors_origins(origins.clone());
        }

        router_config
            .with_max_body_bytes(self.max_body_bytes)
            .with_tracing(!self.no_tracing)
    }
}

// =============================================================================
// Reduce Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ReduceConfig {
    /// Image file to reduce.
    pub input: PathBuf,

    /// Output format: webp, jpeg or jpg.
    #[arg(short, long, default_value = "webp")]
    pub format: OutputFormat,

    /// Resize target: a bounding size (`16`) or exact dimensions (`32x24`).
    #[arg(short, long, default_value_t = Resize::Bound(DEFAULT_RESIZE))]
    pub resize: Resize,

    /// Encoder quality (1-100).
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Write the placeholder image to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ReduceConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(quality) = self.quality {
            if quality == 0 || quality > 100 {
                return Err("quality must be between 1 and 100".to_string());
            }
        }

        Ok(())
    }

    /// Reduction options for these settings.
    pub fn options(&self) -> LqipOptions {
        LqipOptions::default()
            .with_resize(self.resize)
            .with_format(self.format)
            .with_overrides(EncoderOverrides {
                quality: self.quality,
                ..EncoderOverrides::default()
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
