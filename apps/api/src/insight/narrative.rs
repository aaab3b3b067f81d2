//! Text-generation collaborator seam.
//!
//! The resolver reaches language-model text generation only through this
//! trait; the production implementation lives in `llm_client`. Failure is
//! recoverable by contract: callers substitute a fixed fallback narrative.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative generator unavailable: {0}")]
    Unavailable(String),
}

/// Produces the qualitative narrative for evaluation reports.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, NarrativeError>;
}
