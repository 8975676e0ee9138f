use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i16)]
pub enum TagLevel {
    L1 = 1,
    L2 = 2,
    L3 = 3,
}

impl TagLevel {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub level: i16,
    pub category: Option<String>,
    pub is_misc: bool,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn level(&self) -> TagLevel {
        match self.level {
            1 => TagLevel::L1,
            2 => TagLevel::L2,
            _ => TagLevel::L3,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupedTags {
    pub l1: Vec<String>,
    pub l2: Vec<String>,
    pub l3: Vec<String>,
    pub categories: std::collections::HashMap<String, Vec<String>>,
}
