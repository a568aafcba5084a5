use medicine_search::{
    api::{build_router, AppState},
    config::Config,
    dataset::DatasetLoader,
    engine::create_engine,
    indexing::{Initializer, RetryPolicy},
    search::CatalogService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "medicine_search={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(e) = config_error {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }

    tracing::info!("Starting Medicine Search v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = medicine_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Initialize search engine client
    tracing::info!("Engine backend: {:?}", config.engine.backend);
    let engine = create_engine(&config.engine)?;

    let loader = DatasetLoader::new(config.dataset.path.clone());
    let initializer = Arc::new(
        Initializer::new(engine.clone(), config.engine.index.clone(), loader)
            .with_batch_size(config.import.batch_size)
            .with_retry_policy(RetryPolicy {
                max_attempts: config.import.max_attempts,
                delay: config.import.retry_delay(),
            }),
    );

    let catalog = Arc::new(CatalogService::new(
        engine,
        initializer.clone(),
        &config.search,
    ));

    let app = build_router(AppState::new(catalog));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Catalog API: http://{}/api/search", http_addr);

    // Index the dataset in the background; serving continues whatever the outcome
    tokio::spawn(async move {
        match initializer.initialize().await {
            Ok(report) => tracing::info!(
                attempts = report.attempts,
                documents = report.import.indexed,
                "Startup initialization finished"
            ),
            Err(e) => tracing::error!(
                error = %e,
                "Startup initialization failed; queries will retry lazily"
            ),
        }
    });

    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
