//! Riot Games REST API: typed client, routing, and the shared rate limiter.

pub mod client;
pub mod error;
pub mod history;
pub mod models;
pub mod rate_limit;
pub mod routing;

use async_trait::async_trait;
use std::future::Future;
use tracing::warn;

pub use client::{RiotClient, RiotConfig};
pub use error::RiotError;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use routing::{Platform, Regional};

use crate::normalization::{Division, Tier};
use models::{AccountDto, CurrentGameInfo, LeagueEntryDto, LeagueListDto, MatchDto, SummonerDto};

pub const RANKED_SOLO_QUEUE: &str = "RANKED_SOLO_5x5";
pub const RANKED_SOLO_QUEUE_ID: i32 = 420;
pub const SMITE_SPELL_ID: i64 = 11;

/// Retries allowed after a 429 before the error is returned.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct MatchIdsQuery {
    pub queue: Option<i32>,
    pub start: u32,
    pub count: u32,
}

impl Default for MatchIdsQuery {
    fn default() -> Self {
        Self {
            queue: Some(RANKED_SOLO_QUEUE_ID),
            start: 0,
            count: 20,
        }
    }
}

/// The Riot endpoints this service calls. Implemented by [`RiotClient`];
/// the seeder, ingester and live detector only depend on this trait.
#[async_trait]
pub trait RiotApi: Send + Sync {
    fn limiter(&self) -> &RateLimiter;

    async fn league_entries(
        &self,
        platform: Platform,
        tier: Tier,
        division: Division,
        page: u32,
    ) -> Result<Vec<LeagueEntryDto>, RiotError>;

    async fn apex_league(&self, platform: Platform, tier: Tier) -> Result<LeagueListDto, RiotError>;

    async fn summoner_by_id(
        &self,
        platform: Platform,
        summoner_id: &str,
    ) -> Result<SummonerDto, RiotError>;

    async fn summoner_by_puuid(
        &self,
        platform: Platform,
        puuid: &str,
    ) -> Result<SummonerDto, RiotError>;

    async fn account_by_riot_id(
        &self,
        regional: Regional,
        game_name: &str,
        tag_line: &str,
    ) -> Result<AccountDto, RiotError>;

    async fn match_ids_by_puuid(
        &self,
        regional: Regional,
        puuid: &str,
        query: MatchIdsQuery,
    ) -> Result<Vec<String>, RiotError>;

    async fn match_by_id(&self, regional: Regional, match_id: &str) -> Result<MatchDto, RiotError>;

    async fn active_game(
        &self,
        platform: Platform,
        puuid: &str,
    ) -> Result<Option<CurrentGameInfo>, RiotError>;
}

/// Run `op`, retrying on 429 up to `max_retries` times with the limiter's
/// exponential backoff. Any other error is returned immediately.
pub async fn with_rate_limit_retry<T, F, Fut>(
    limiter: &RateLimiter,
    max_retries: u32,
    mut op: F,
) -> Result<T, RiotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RiotError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(RiotError::RateLimited { retry_after }) if attempt < max_retries => {
                attempt += 1;
                limiter.handle_rate_limit_error(attempt, retry_after).await;
            }
            Err(e @ RiotError::RateLimited { .. }) => {
                warn!(attempts = attempt, "giving up after repeated rate limiting");
                return Err(e);
            }
            other => return other,
        }
    }
}
