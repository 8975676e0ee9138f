//! TaggerNews library: a Hacker News mirror that scrapes, enriches with an LLM-derived
//! summary/tag set, and exposes a small read-mostly query API over the result.

use std::sync::Arc;

use sqlx::PgPool;

pub mod agent;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod filter;
pub mod handlers;
pub mod hn_client;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod scheduler;
pub mod scraper;
pub mod taxonomy;
pub mod utils;

pub use config::Config;
pub use llm::Oracle;

/// Shared application state. Every handler gets a clone of the `Arc`; the pool and
/// oracle are themselves cheap to clone, so no inner `Arc<Mutex<_>>` layer is needed.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub hn_client: hn_client::HnClient,
    pub oracle: Arc<dyn Oracle>,
}
