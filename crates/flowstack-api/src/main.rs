use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flowstack_api::{config::Config, routes::build_router, state::AppState};
use flowstack_graph::{Engine, EngineConfig};
use flowstack_kb::HttpKnowledgeStore;
use flowstack_llm::OllamaClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Flowstack API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize generative backend client
    tracing::info!("Initializing Ollama client at {}", config.ollama.base_url);
    let ollama = Arc::new(OllamaClient::new(config.ollama.base_url.clone())?);

    // Initialize knowledge store client
    tracing::info!("Initializing knowledge store at {}", config.knowledge.base_url);
    let knowledge: Arc<dyn flowstack_kb::KnowledgeStore> =
        Arc::new(HttpKnowledgeStore::new(config.knowledge.base_url.clone())?);

    // Initialize pipeline store
    let store = build_store(&config).await?;

    // Create execution engine
    let engine_config = EngineConfig::default()
        .with_default_model(config.engine.default_model.clone())
        .with_default_embed_model(config.engine.default_embed_model.clone())
        .with_default_top_k(config.engine.default_top_k);
    let engine = Engine::new(ollama, Arc::clone(&knowledge)).with_config(engine_config);

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), store, knowledge, engine));

    // Build router
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "mongodb")]
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn flowstack_persist::PipelineStore>> {
    if config.mongodb_uri.is_empty() {
        tracing::warn!("MONGODB_URI not set, using in-memory pipeline store");
        return Ok(Arc::new(flowstack_persist::MemoryPipelineStore::default()));
    }

    tracing::info!("Connecting to MongoDB");
    let store = flowstack_persist::MongoPipelineStore::connect(
        &config.mongodb_uri,
        &config.mongodb.database,
    )
    .await?;
    tracing::info!("MongoDB connected");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn build_store(_config: &Config) -> anyhow::Result<Arc<dyn flowstack_persist::PipelineStore>> {
    tracing::info!("Using in-memory pipeline store");
    Ok(Arc::new(flowstack_persist::MemoryPipelineStore::default()))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
