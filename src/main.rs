use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use photo_tagger::{
    app_state::{AppState, JobDefaults},
    config::AppConfig,
    db, routes,
    services::{
        inference::ClipHttpClient,
        orchestrator::{BatchOrchestrator, OrchestratorSettings},
        translation::LabelTranslator,
        vocabulary,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    config.validate().expect("Invalid configuration");

    tracing::info!("Initializing photo-tagger server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("tagging_jobs_total", "Directory tagging jobs started");
    metrics::describe_counter!("tagging_images_total", "Images attempted by tagging jobs");
    metrics::describe_counter!("tagging_images_failed", "Images that failed to load or score");
    metrics::describe_counter!("tagging_saves_failed", "Tag records that failed to persist");
    metrics::describe_histogram!("tagging_group_seconds", "Time to tag and save one group");
    metrics::describe_gauge!("tagging_jobs_active", "Directory jobs currently running");

    // Connect the tag store and create its table if needed
    let engine = config.engine().expect("Failed to resolve storage engine");
    tracing::info!(engine = %engine, table = %config.tag_table, "Opening tag store");
    let store = db::open_store(
        engine,
        &config.database_url,
        &config.tag_table,
        &config.pool_settings(),
    )
    .await
    .expect("Failed to open tag store");

    // Candidate vocabulary and display-label translation
    let vocabulary = match &config.vocabulary_path {
        Some(path) => vocabulary::load_vocabulary(path).expect("Failed to load vocabulary"),
        None => vocabulary::default_vocabulary(),
    };
    let translator = match &config.translation_path {
        Some(path) => LabelTranslator::from_json_file(path, config.unmapped_labels())
            .expect("Failed to load translation table"),
        None => LabelTranslator::identity(),
    };
    let translator = Arc::new(translator);
    tracing::info!(
        labels = vocabulary.len(),
        translations = translator.len(),
        "Vocabulary loaded"
    );

    // Inference service client
    tracing::info!(url = %config.inference_url, "Initializing inference client");
    let inference = ClipHttpClient::new(&config.inference_url, config.inference_timeout())
        .expect("Failed to initialize inference client");

    let orchestrator = BatchOrchestrator::new(
        Arc::new(inference),
        store.clone(),
        Arc::clone(&translator),
        OrchestratorSettings {
            max_image_side: config.max_image_side,
            task_timeout: config.inference_timeout(),
        },
    );

    let defaults = JobDefaults {
        top_k: config.default_top_k,
        group_size: config.group_size,
        pacing_delay: config.pacing_delay(),
    };

    // Create shared application state
    let state = AppState::new(store.clone(), orchestrator, vocabulary, translator, defaults);

    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Stopping photo-tagger");
    store.close().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
