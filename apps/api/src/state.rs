use std::sync::Arc;

use sqlx::MySqlPool;

use crate::config::Config;
use crate::insight::executor::QueryExecutor;
use crate::insight::narrative::Narrator;
use crate::schema::SchemaDoc;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: MySqlPool,
    pub config: Config,
    /// Schema description document, loaded once at startup. Startup fails
    /// without it.
    pub schema: Arc<SchemaDoc>,
    /// Data-store seam used by the resolver. Production: MySqlExecutor over `db`.
    pub executor: Arc<dyn QueryExecutor>,
    /// Text-generation seam for evaluation narratives. Production: OllamaClient.
    pub narrator: Arc<dyn Narrator>,
}
