//! LQIP Server - Low quality image placeholders over HTTP.
//!
//! This binary starts the HTTP server, or reduces a single local file.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lqip_server::{
    config::{Cli, Command, ReduceConfig, ServeConfig},
    lqip::{compute_lqip_image, LqipService},
    server::create_router,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Reduce(config) => run_reduce(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("LQIP Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");

    if config.has_api_key() {
        info!("  Auth: API key required");
    } else {
        warn!("  Auth: NO API KEY CONFIGURED - every request will be rejected with 500");
        warn!("        Set --api-key or API_KEY");
    }

    info!(
        "  Cache: {} placeholders, max body {} bytes",
        config.cache_entries, config.max_body_bytes
    );
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let lqip_service = LqipService::with_cache_capacity(config.cache_entries);
    let router = create_router(lqip_service, config.router_config());

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try it:");
    info!("    curl -F file=@photo.jpg -F apiKey=<key> http://{}/", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "lqip_server=debug,tower_http=debug"
    } else {
        "lqip_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Reduce Command
// =============================================================================

async fn run_reduce(config: ReduceConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let input = match tokio::fs::read(&config.input).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let lqip = match compute_lqip_image(&input, &config.options()) {
        Ok(lqip) => lqip,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref output) = config.output {
        if let Err(e) = tokio::fs::write(output, &lqip.content).await {
            eprintln!("Error: failed to write {}: {}", output.display(), e);
            return ExitCode::FAILURE;
        }
    }

    match serde_json::to_string_pretty(&lqip.metadata) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
