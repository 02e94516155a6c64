//! Ladder crawler: walk every (platform, tier, division) bucket, resolve a
//! handful of players per bucket and ingest their recent ranked matches.
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{IngestConfig, IngestOutcome, MatchIngester, MatchStore};
use crate::normalization::{Division, Tier};
use crate::riot::{
    with_rate_limit_retry, MatchIdsQuery, Platform, RiotApi, MAX_RATE_LIMIT_RETRIES,
    RANKED_SOLO_QUEUE_ID,
};
use crate::util::env::{env_list, env_parse};

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub platforms: Vec<Platform>,
    pub players_per_bucket: usize,
    pub matches_per_player: u32,
    pub batch_size: usize,
    /// Upper bound on league-entry pages read per divided bucket.
    pub max_pages: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            platforms: vec![Platform::Na1],
            players_per_bucket: 10,
            matches_per_player: 10,
            batch_size: 5,
            max_pages: 3,
        }
    }
}

impl SeedConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let platforms: Vec<Platform> = env_list("SEED_REGIONS")
            .iter()
            .filter_map(|raw| {
                let parsed = Platform::parse(raw);
                if parsed.is_none() {
                    warn!(region = %raw, "ignoring unknown SEED_REGIONS entry");
                }
                parsed
            })
            .collect();
        Self {
            platforms: if platforms.is_empty() { d.platforms } else { platforms },
            players_per_bucket: env_parse("SEED_PLAYERS_PER_BUCKET", d.players_per_bucket),
            matches_per_player: env_parse("SEED_MATCHES_PER_PLAYER", d.matches_per_player),
            batch_size: env_parse("SEED_BATCH_SIZE", d.batch_size).max(1),
            max_pages: env_parse("SEED_MAX_PAGES", d.max_pages).max(1),
        }
    }
}

/// One ladder slice. Apex tiers have no division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedBucket {
    pub platform: Platform,
    pub tier: Tier,
    pub division: Option<Division>,
}

impl fmt::Display for SeedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.division {
            Some(div) => write!(f, "{} {} {}", self.platform, self.tier, div.as_api_str()),
            None => write!(f, "{} {}", self.platform, self.tier),
        }
    }
}

/// Divided tiers in ladder order with every division, then the apex leagues,
/// for each platform.
pub fn buckets(platforms: &[Platform]) -> Vec<SeedBucket> {
    let mut out = Vec::new();
    for &platform in platforms {
        for tier in Tier::DIVIDED {
            for division in Division::ALL {
                out.push(SeedBucket {
                    platform,
                    tier,
                    division: Some(division),
                });
            }
        }
        for tier in Tier::APEX {
            out.push(SeedBucket {
                platform,
                tier,
                division: None,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedProgress {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub current_bucket: Option<String>,
    pub buckets_done: usize,
    pub buckets_total: usize,
    pub players_processed: usize,
    pub players_failed: usize,
    pub matches_ingested: usize,
    pub matches_skipped: usize,
    pub matches_already_stored: usize,
    pub errors: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
struct SeedPlayer {
    summoner_id: Option<String>,
    puuid: Option<String>,
}

pub struct BatchSeeder {
    api: Arc<dyn RiotApi>,
    ingester: MatchIngester,
    cfg: SeedConfig,
    progress: Arc<RwLock<SeedProgress>>,
}

impl BatchSeeder {
    pub fn new(
        api: Arc<dyn RiotApi>,
        store: Arc<dyn MatchStore>,
        ingest_cfg: IngestConfig,
        cfg: SeedConfig,
    ) -> Self {
        let ingester = MatchIngester::new(api.clone(), store, ingest_cfg);
        Self {
            api,
            ingester,
            cfg,
            progress: Arc::new(RwLock::new(SeedProgress::default())),
        }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.cfg
    }

    pub async fn progress(&self) -> SeedProgress {
        self.progress.read().await.clone()
    }

    pub fn progress_handle(&self) -> Arc<RwLock<SeedProgress>> {
        self.progress.clone()
    }

    /// Start a run in the background. Returns `false` when one is already running.
    pub async fn trigger(self: &Arc<Self>) -> bool {
        if !self.try_begin().await {
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_started().await;
        });
        true
    }

    /// Run to completion and return the final progress snapshot.
    pub async fn run(&self) -> Result<SeedProgress> {
        if !self.try_begin().await {
            bail!("a seed run is already in progress");
        }
        self.run_started().await;
        Ok(self.progress().await)
    }

    async fn try_begin(&self) -> bool {
        let mut p = self.progress.write().await;
        if p.running {
            return false;
        }
        *p = SeedProgress {
            running: true,
            started_at: Some(Utc::now()),
            buckets_total: self.cfg.platforms.len() * (Tier::DIVIDED.len() * 4 + Tier::APEX.len()),
            ..SeedProgress::default()
        };
        true
    }

    async fn run_started(&self) {
        let seen: DashSet<String> = DashSet::new();
        for bucket in buckets(&self.cfg.platforms) {
            self.progress.write().await.current_bucket = Some(bucket.to_string());
            self.seed_bucket(bucket, &seen).await;
            self.progress.write().await.buckets_done += 1;
        }
        let mut p = self.progress.write().await;
        p.running = false;
        p.current_bucket = None;
        p.finished_at = Some(Utc::now());
        info!(
            players = p.players_processed,
            ingested = p.matches_ingested,
            skipped = p.matches_skipped,
            already_stored = p.matches_already_stored,
            errors = p.errors,
            "seed run finished"
        );
    }

    async fn seed_bucket(&self, bucket: SeedBucket, seen: &DashSet<String>) {
        let players = match self.bucket_players(bucket).await {
            Ok(players) => players,
            Err(e) => {
                warn!(%bucket, error = %e, "failed to list bucket players");
                self.record_error(format!("{bucket}: {e}")).await;
                return;
            }
        };
        debug!(%bucket, players = players.len(), "seeding bucket");

        let mut batches = players.chunks(self.cfg.batch_size).peekable();
        while let Some(batch) = batches.next() {
            join_all(batch.iter().map(|player| self.seed_player(bucket, player, seen))).await;
            if batches.peek().is_some() {
                self.api.limiter().wait_for_batch().await;
            }
        }
    }

    async fn bucket_players(&self, bucket: SeedBucket) -> Result<Vec<SeedPlayer>> {
        let limit = self.cfg.players_per_bucket;
        let limiter = self.api.limiter();

        let Some(division) = bucket.division else {
            let league = with_rate_limit_retry(limiter, MAX_RATE_LIMIT_RETRIES, || {
                self.api.apex_league(bucket.platform, bucket.tier)
            })
            .await?;
            let mut entries = league.entries;
            entries.sort_by(|a, b| b.league_points.cmp(&a.league_points));
            return Ok(entries
                .into_iter()
                .take(limit)
                .map(|e| SeedPlayer {
                    summoner_id: e.summoner_id,
                    puuid: e.puuid,
                })
                .collect());
        };

        let mut players = Vec::new();
        for page in 1..=self.cfg.max_pages {
            let entries = with_rate_limit_retry(limiter, MAX_RATE_LIMIT_RETRIES, || {
                self.api
                    .league_entries(bucket.platform, bucket.tier, division, page)
            })
            .await?;
            if entries.is_empty() {
                break;
            }
            players.extend(entries.into_iter().map(|e| SeedPlayer {
                summoner_id: e.summoner_id,
                puuid: e.puuid,
            }));
            if players.len() >= limit {
                break;
            }
        }
        players.truncate(limit);
        Ok(players)
    }

    async fn seed_player(
        &self,
        bucket: SeedBucket,
        player: &SeedPlayer,
        seen: &DashSet<String>,
    ) {
        let match_ids = match self.player_match_ids(bucket, player).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(%bucket, summoner_id = ?player.summoner_id, error = %e, "skipping player");
                let mut p = self.progress.write().await;
                p.players_failed += 1;
                p.errors += 1;
                p.last_error = Some(e.to_string());
                return;
            }
        };

        let bracket = bucket.tier.bracket();
        for match_id in match_ids {
            if !seen.insert(match_id.clone()) {
                continue;
            }
            match self.ingester.ingest(bucket.platform, &match_id, bracket).await {
                Ok(outcome) => {
                    let mut p = self.progress.write().await;
                    match outcome {
                        IngestOutcome::Stored { .. } => p.matches_ingested += 1,
                        IngestOutcome::Skipped { .. } => p.matches_skipped += 1,
                        IngestOutcome::AlreadyStored => p.matches_already_stored += 1,
                    }
                }
                Err(e) => {
                    warn!(%bucket, match_id, error = %e, "failed to ingest match");
                    self.record_error(format!("{match_id}: {e:#}")).await;
                }
            }
        }
        self.progress.write().await.players_processed += 1;
    }

    async fn player_match_ids(&self, bucket: SeedBucket, player: &SeedPlayer) -> Result<Vec<String>> {
        let limiter = self.api.limiter();
        let puuid = match (&player.puuid, &player.summoner_id) {
            (Some(puuid), _) if !puuid.is_empty() => puuid.clone(),
            (_, Some(summoner_id)) => {
                with_rate_limit_retry(limiter, MAX_RATE_LIMIT_RETRIES, || {
                    self.api.summoner_by_id(bucket.platform, summoner_id)
                })
                .await?
                .puuid
            }
            _ => bail!("league entry has neither puuid nor summoner id"),
        };

        let query = MatchIdsQuery {
            queue: Some(RANKED_SOLO_QUEUE_ID),
            start: 0,
            count: self.cfg.matches_per_player,
        };
        let regional = bucket.platform.regional();
        let ids = with_rate_limit_retry(limiter, MAX_RATE_LIMIT_RETRIES, || {
            self.api.match_ids_by_puuid(regional, &puuid, query)
        })
        .await?;
        Ok(ids)
    }

    async fn record_error(&self, message: String) {
        let mut p = self.progress.write().await;
        p.errors += 1;
        p.last_error = Some(message);
    }
}
