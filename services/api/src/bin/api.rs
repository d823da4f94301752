//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        case_llm::OpenAiCompletionAdapter, db::DbAdapter, embeddings::OpenAiEmbeddingAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        evaluate_handler, generate_case_handler, health_handler, next_case_handler,
        rest::ApiDoc, state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use practice_lab_core::{
    evaluator::AnswerEvaluator, generator::NoveltyGatedGenerator, ports::CaseStoreService,
    selector::UnseenCaseSelector,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(&config.openai_api_key);
    if let Some(base_url) = &config.openai_base_url {
        openai_config = openai_config.with_api_base(base_url);
    }
    let openai_client = Client::with_config(openai_config);

    let embedder = Arc::new(OpenAiEmbeddingAdapter::new(
        config.openai_api_key.clone(),
        config.embedding_base_url.clone(),
        config.embedding_model.clone(),
    ));
    let case_model = Arc::new(OpenAiCompletionAdapter::new(
        openai_client.clone(),
        config.case_model.clone(),
    ));
    let eval_model = Arc::new(OpenAiCompletionAdapter::new(
        openai_client.clone(),
        config.eval_model.clone(),
    ));

    // --- 4. Assemble the Pipeline & Shared AppState ---
    let store: Arc<dyn CaseStoreService> = db_adapter;
    let generator = Arc::new(
        NoveltyGatedGenerator::new(store.clone(), embedder, case_model)
            .with_tuning(config.novelty_threshold, config.match_count),
    );
    let selector = Arc::new(UnseenCaseSelector::new(store.clone(), generator.clone()));
    let evaluator = Arc::new(AnswerEvaluator::new(store.clone(), eval_model));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
        selector,
        generator,
        evaluator,
    });

    // --- 5. Create the Web Router ---
    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .route("/cases/next", get(next_case_handler))
        .route("/cases/generate", post(generate_case_handler))
        .route("/evaluate", post(evaluate_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
