//! Environment-driven configuration.
//!
//! Per SPEC_FULL §10, configuration here is environment-only: no CLI-argument layer and
//! no TOML config file, unlike the wider ambient convention this crate's layout is drawn
//! from. All env vars are read case-insensitively (upper-cased before lookup).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub upstream: UpstreamConfig,
    pub scraper: ScraperConfig,
    pub enrichment: EnrichmentConfig,
    pub agent: AgentConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub hn_api_base_url: String,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub backfill_batch_size: i64,
    pub backfill_max_batches: i64,
    pub backfill_days_dev: i64,
    pub backfill_days_prod: i64,
    pub continuous_batch_size: i64,
    pub rate_limit_delay_ms: u64,
    pub backfill_interval_minutes: u64,
    pub continuous_interval_minutes: u64,
    pub recovery_interval_minutes: u64,
}

impl ScraperConfig {
    pub fn backfill_days(&self, env: Environment) -> i64 {
        if env.is_production() { self.backfill_days_prod } else { self.backfill_days_dev }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub openai_api_key: Option<String>,
    pub summarization_model: String,
    pub summarization_batch_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub analysis_window_days: i64,
    pub min_tag_usage: i64,
    pub max_proposals_per_run: i64,
    pub enable_auto_approve: bool,
    pub auto_approve_max_affected: i32,
    pub run_interval_weeks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, applying `.env` first in
    /// development (via dotenvy) so local runs don't need exported shell state.
    pub fn load() -> Result<Self, anyhow::Error> {
        let _ = dotenvy::dotenv();

        let environment = Environment::parse(&env_or("ENVIRONMENT", "development"));

        let config = Config {
            environment,
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse_or("SERVER_PORT", 8080)?,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "postgres://localhost/taggernews"),
            },
            logging: LoggingConfig {
                level: env_or("LOG_LEVEL", "info,taggernews=debug"),
                file: std::env::var("LOG_FILE").ok(),
            },
            upstream: UpstreamConfig {
                hn_api_base_url: env_or(
                    "HN_API_BASE_URL",
                    "https://hacker-news.firebaseio.com/v0",
                ),
                max_concurrent_requests: env_parse_or("HN_MAX_CONCURRENT_REQUESTS", 10)?,
                request_timeout_secs: env_parse_or("HN_REQUEST_TIMEOUT_SECS", 30)?,
            },
            scraper: ScraperConfig {
                backfill_batch_size: env_parse_or("SCRAPER_BACKFILL_BATCH_SIZE", 100)?,
                backfill_max_batches: env_parse_or("SCRAPER_BACKFILL_MAX_BATCHES", 50)?,
                backfill_days_dev: env_parse_or("SCRAPER_BACKFILL_DAYS_DEV", 7)?,
                backfill_days_prod: env_parse_or("SCRAPER_BACKFILL_DAYS_PROD", 30)?,
                continuous_batch_size: env_parse_or("SCRAPER_CONTINUOUS_BATCH_SIZE", 50)?,
                rate_limit_delay_ms: env_parse_or("SCRAPER_RATE_LIMIT_DELAY_MS", 50)?,
                backfill_interval_minutes: env_parse_or(
                    "SCRAPER_BACKFILL_INTERVAL_MINUTES",
                    10,
                )?,
                continuous_interval_minutes: env_parse_or(
                    "SCRAPER_CONTINUOUS_INTERVAL_MINUTES",
                    5,
                )?,
                recovery_interval_minutes: env_parse_or("SCRAPER_RECOVERY_INTERVAL_MINUTES", 30)?,
            },
            enrichment: EnrichmentConfig {
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                summarization_model: env_or("SUMMARIZATION_MODEL", "gpt-4o-mini"),
                summarization_batch_size: env_parse_or("SUMMARIZATION_BATCH_SIZE", 5)?,
            },
            agent: AgentConfig {
                analysis_window_days: env_parse_or("AGENT_ANALYSIS_WINDOW_DAYS", 30)?,
                min_tag_usage: env_parse_or("AGENT_MIN_TAG_USAGE", 3)?,
                max_proposals_per_run: env_parse_or("AGENT_MAX_PROPOSALS_PER_RUN", 10)?,
                enable_auto_approve: env_parse_or("AGENT_ENABLE_AUTO_APPROVE", false)?,
                auto_approve_max_affected: env_parse_or("AGENT_AUTO_APPROVE_MAX_AFFECTED", 5)?,
                run_interval_weeks: env_parse_or("AGENT_RUN_INTERVAL_WEEKS", 1)?,
            },
            auth: AuthConfig { api_key: std::env::var("API_KEY").ok() },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("server port cannot be 0");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database url cannot be empty");
        }
        if self.scraper.backfill_batch_size <= 0 || self.scraper.continuous_batch_size <= 0 {
            anyhow::bail!("scraper batch sizes must be positive");
        }
        Ok(())
    }
}

/// Reads `key` (uppercased) from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key.to_uppercase()).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key.to_uppercase()) {
        Ok(val) => val
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
