// Query-intent resolution core.
// Turns free-text KPI questions into parameterized MySQL queries and renders
// the results as chat-facing reports. All language-model calls go through the
// `narrative` seam (implemented by `llm_client`); all SQL goes through the
// `executor` seam.

pub mod classifier;
pub mod executor;
pub mod extract;
pub mod format;
pub mod handlers;
pub mod narrative;
pub mod prompts;
pub mod queries;
pub mod resolver;
pub mod rows;
