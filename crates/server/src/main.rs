use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barrage_core::{
    load_config, validate_config, AggregationContext, CompatSource, Config, DurableStore,
    RestKvStore, SourceAdapter,
};

use barrage_server::api::create_router;
use barrage_server::state::AppState;

/// How often expired rate-limit windows are swept.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("BARRAGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; a missing file means "all defaults"
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");
    info!(
        "Sources: {} compat server(s), timeout {}ms",
        config.sources.compat_servers.len(),
        config.sources.timeout_ms
    );

    // Create source adapters
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for compat in &config.sources.compat_servers {
        info!("Initializing compat source {} at {}", compat.name, compat.url);
        adapters.push(Arc::new(CompatSource::new(
            compat.clone(),
            config.sources.timeout_ms,
        )));
    }
    if adapters.is_empty() {
        warn!("No sources configured; search and match will return empty results");
    }

    // Create durable store if configured
    let store: Option<Arc<dyn DurableStore>> = match &config.store {
        Some(store_config) => {
            info!("Initializing durable store at {}", store_config.url);
            let store = RestKvStore::new(store_config.clone());
            if let Err(e) = store.ping().await {
                warn!("Durable store is unreachable, continuing without it: {}", e);
            }
            Some(Arc::new(store))
        }
        None => {
            info!("No durable store configured, state is in-memory only");
            None
        }
    };

    // Create the aggregation context and restore persisted state
    let context = Arc::new(AggregationContext::new(config.clone(), adapters, store));
    context.ensure_loaded().await;

    // Sweep expired rate-limit windows in the background
    let sweeper_context = Arc::clone(&context);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper_context.sweep_rate_limiter().await;
        }
    });

    // Create app state and router
    let state = Arc::new(AppState::new(context));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
