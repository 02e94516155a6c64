//! Match ingestion: fetch a match once, validate it, and persist its rows.

pub mod mapper;
pub mod seeder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub use mapper::{map_match, MatchRows, SkipReason};
pub use seeder::{BatchSeeder, SeedConfig, SeedProgress};

use crate::normalization::RankBracket;
use crate::riot::{
    with_rate_limit_retry, Platform, RiotApi, MAX_RATE_LIMIT_RETRIES, RANKED_SOLO_QUEUE_ID,
};
use crate::util::env::{env_list, env_parse};

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Queue ids that are stored; everything else is skipped.
    pub queues: Vec<i32>,
    /// Games shorter than this (seconds) are skipped.
    pub min_duration_s: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queues: vec![RANKED_SOLO_QUEUE_ID],
            min_duration_s: 300,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let queues: Vec<i32> = env_list("INGEST_QUEUES")
            .iter()
            .filter_map(|q| q.parse().ok())
            .collect();
        Self {
            queues: if queues.is_empty() { d.queues } else { queues },
            min_duration_s: env_parse("INGEST_MIN_DURATION_S", d.min_duration_s),
        }
    }
}

/// Persistence seam for raw match rows. [`crate::database_ops::matches::PgMatchStore`]
/// is the production implementation.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn match_exists(&self, match_id: &str) -> Result<bool>;

    /// Insert all rows in one transaction. Returns `false` when the match
    /// row already existed (a concurrent ingest won), in which case nothing
    /// else is written.
    async fn insert_match(&self, rows: &MatchRows) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    AlreadyStored,
    Skipped { reason: SkipReason },
    Stored { rows: usize },
}

pub struct MatchIngester {
    api: Arc<dyn RiotApi>,
    store: Arc<dyn MatchStore>,
    cfg: IngestConfig,
}

impl MatchIngester {
    pub fn new(api: Arc<dyn RiotApi>, store: Arc<dyn MatchStore>, cfg: IngestConfig) -> Self {
        Self { api, store, cfg }
    }

    /// Ingest `match_id` unless it is already stored. 429s are retried with
    /// backoff; every other error is returned to the caller.
    #[instrument(skip(self))]
    pub async fn ingest(
        &self,
        platform: Platform,
        match_id: &str,
        rank_bracket: RankBracket,
    ) -> Result<IngestOutcome> {
        if self.store.match_exists(match_id).await? {
            debug!(match_id, "match already stored");
            return Ok(IngestOutcome::AlreadyStored);
        }

        let regional = platform.regional();
        let dto = with_rate_limit_retry(self.api.limiter(), MAX_RATE_LIMIT_RETRIES, || {
            self.api.match_by_id(regional, match_id)
        })
        .await
        .with_context(|| format!("fetching match {match_id}"))?;

        let rows = match map_match(&dto, rank_bracket, platform, &self.cfg) {
            Ok(rows) => rows,
            Err(reason) => {
                debug!(match_id, %reason, "match skipped");
                return Ok(IngestOutcome::Skipped { reason });
            }
        };

        if !self.store.insert_match(&rows).await? {
            return Ok(IngestOutcome::AlreadyStored);
        }
        let count = rows.row_count();
        info!(match_id, patch = %rows.match_row.patch, rows = count, "match stored");
        Ok(IngestOutcome::Stored { rows: count })
    }
}
