// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database_ops::query::StatsFilter;
use crate::riot::history::MatchSummary;
use crate::scheduler::AggregateKind;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub cache: String,
    pub uptime_seconds: u64,
}

/// `?rank=&role=&patch=&region=&queue=`; every field accepts `all`.
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub rank: Option<String>,
    pub role: Option<String>,
    pub patch: Option<String>,
    pub region: Option<String>,
    pub queue: Option<String>,
}

impl StatsParams {
    pub fn filter(&self) -> Result<StatsFilter, String> {
        StatsFilter::from_params(
            self.rank.as_deref(),
            self.role.as_deref(),
            self.patch.as_deref(),
            self.region.as_deref(),
            self.queue.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BuildParams {
    pub rank: Option<String>,
    pub role: Option<String>,
    pub patch: Option<String>,
    pub region: Option<String>,
    pub queue: Option<String>,
    pub min_games: Option<i64>,
    pub limit: Option<i64>,
}

impl BuildParams {
    pub fn filter(&self) -> Result<StatsFilter, String> {
        StatsFilter::from_params(
            self.rank.as_deref(),
            self.role.as_deref(),
            self.patch.as_deref(),
            self.region.as_deref(),
            self.queue.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub region: String,
    /// Either a puuid or a Riot ID (`game_name` + `tag_line`).
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AggregateParams {
    #[serde(default)]
    pub kind: AggregateKind,
}

#[derive(Debug, Serialize)]
pub struct SummonerProfile {
    pub puuid: String,
    pub game_name: Option<String>,
    pub tag_line: Option<String>,
    pub region: String,
    pub profile_icon_id: i32,
    pub summoner_level: i64,
    pub matches: Vec<MatchSummary>,
}
