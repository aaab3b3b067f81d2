mod config;
mod db;
mod errors;
mod insight;
mod llm_client;
mod routes;
mod schema;
mod state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::insight::executor::MySqlExecutor;
use crate::llm_client::OllamaClient;
use crate::routes::build_router;
use crate::schema::load_schema_doc;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sibyl API v{}", env!("CARGO_PKG_VERSION"));

    // Load the schema description; the service must not start without it
    let schema = Arc::new(load_schema_doc(Path::new(&config.schema_path))?);
    info!("Schema description loaded: {} tables", schema.table_count());

    // Initialize MySQL (the KPI store)
    let pool = create_pool(&config.database_url).await?;

    // Initialize the Ollama narrative client
    let narrator = OllamaClient::new(config.ollama_url.clone(), config.ollama_model.clone());
    info!("LLM client initialized (model: {})", config.ollama_model);

    // Build app state
    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        schema,
        executor: Arc::new(MySqlExecutor::new(pool)),
        narrator: Arc::new(narrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
