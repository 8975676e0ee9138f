use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperStateType {
    Backfill,
    Continuous,
}

impl ScraperStateType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backfill => "backfill",
            Self::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperStatus {
    Active,
    Completed,
    Paused,
}

impl ScraperStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "paused" => Self::Paused,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScraperState {
    pub id: i64,
    pub state_type: String,
    pub current_item_id: i64,
    pub target_timestamp: Option<DateTime<Utc>>,
    pub status: String,
    pub items_processed: i64,
    pub stories_found: i64,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScraperState {
    pub fn status(&self) -> ScraperStatus {
        ScraperStatus::parse(&self.status)
    }
}

/// Stats produced by one invocation of the shared batch kernel (SPEC_FULL §4.2).
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub items_scanned: i64,
    pub stories_found: i64,
    pub stories_new: i64,
    pub reached_target_date: bool,
}
