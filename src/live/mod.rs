//! Live game detection for tracked summoners.
pub mod roles;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

pub use roles::{infer_team_roles, LaneCandidate, RoleShares};

use crate::util::db::Db;
use crate::database_ops::query::champion_role_shares;
use crate::database_ops::tracked::{list_tracked, set_last_game_id, upsert_tracked, TrackedSummoner};
use crate::normalization::Role;
use crate::riot::models::CurrentGameInfo;
use crate::riot::{with_rate_limit_retry, Platform, RiotApi, MAX_RATE_LIMIT_RETRIES, SMITE_SPELL_ID};

pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivePlayer {
    pub puuid: Option<String>,
    pub riot_id: Option<String>,
    pub champion_id: i64,
    pub spell1_id: i64,
    pub spell2_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveTeam {
    pub team_id: i64,
    pub players: Vec<LivePlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveBan {
    pub team_id: i64,
    pub champion_id: i64,
    pub pick_turn: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveGame {
    pub game_id: i64,
    pub platform: Platform,
    pub queue_id: Option<i32>,
    pub game_mode: String,
    pub game_start_time: i64,
    pub teams: Vec<LiveTeam>,
    pub bans: Vec<LiveBan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveEvent {
    GameStarted { puuid: String, game: LiveGame },
}

/// Shape a spectator payload, grouping players by team and guessing lanes.
pub fn live_game(platform: Platform, info: &CurrentGameInfo, shares: &RoleShares) -> LiveGame {
    let mut team_ids: Vec<i64> = info.participants.iter().map(|p| p.team_id).collect();
    team_ids.sort_unstable();
    team_ids.dedup();

    let teams = team_ids
        .into_iter()
        .map(|team_id| {
            let members: Vec<_> = info
                .participants
                .iter()
                .filter(|p| p.team_id == team_id)
                .collect();
            let candidates: Vec<LaneCandidate> = members
                .iter()
                .map(|p| LaneCandidate {
                    champion_id: p.champion_id as i32,
                    has_smite: p.spell1_id == SMITE_SPELL_ID || p.spell2_id == SMITE_SPELL_ID,
                })
                .collect();
            let roles = infer_team_roles(&candidates, shares);
            LiveTeam {
                team_id,
                players: members
                    .into_iter()
                    .zip(roles)
                    .map(|(p, role)| LivePlayer {
                        puuid: p.puuid.clone(),
                        riot_id: p.riot_id.clone(),
                        champion_id: p.champion_id,
                        spell1_id: p.spell1_id,
                        spell2_id: p.spell2_id,
                        role,
                    })
                    .collect(),
            }
        })
        .collect();

    LiveGame {
        game_id: info.game_id,
        platform,
        queue_id: info.game_queue_config_id,
        game_mode: info.game_mode.clone(),
        game_start_time: info.game_start_time,
        teams,
        bans: info
            .banned_champions
            .iter()
            .filter(|b| b.champion_id > 0)
            .map(|b| LiveBan {
                team_id: b.team_id,
                champion_id: b.champion_id,
                pick_turn: b.pick_turn,
            })
            .collect(),
    }
}

/// What the detector needs from storage.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn track(
        &self,
        puuid: &str,
        platform: Platform,
        game_name: Option<&str>,
        tag_line: Option<&str>,
    ) -> Result<TrackedSummoner>;
    async fn tracked(&self) -> Result<Vec<TrackedSummoner>>;
    async fn record_game(&self, puuid: &str, game_id: i64) -> Result<()>;
    async fn role_shares(&self) -> Result<RoleShares>;
}

#[async_trait]
impl TrackingStore for Db {
    async fn track(
        &self,
        puuid: &str,
        platform: Platform,
        game_name: Option<&str>,
        tag_line: Option<&str>,
    ) -> Result<TrackedSummoner> {
        upsert_tracked(self, puuid, platform.as_str(), game_name, tag_line).await
    }

    async fn tracked(&self) -> Result<Vec<TrackedSummoner>> {
        list_tracked(self).await
    }

    async fn record_game(&self, puuid: &str, game_id: i64) -> Result<()> {
        set_last_game_id(self, puuid, game_id).await?;
        Ok(())
    }

    async fn role_shares(&self) -> Result<RoleShares> {
        champion_role_shares(self, None).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollSummary {
    pub checked: usize,
    pub in_game: usize,
    pub started: usize,
    pub errors: usize,
}

pub struct LiveGameDetector {
    api: Arc<dyn RiotApi>,
    store: Arc<dyn TrackingStore>,
    events: broadcast::Sender<LiveEvent>,
}

impl LiveGameDetector {
    pub fn new(api: Arc<dyn RiotApi>, store: Arc<dyn TrackingStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { api, store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.events.subscribe()
    }

    /// Current game for one player, if any.
    pub async fn current_game(&self, platform: Platform, puuid: &str) -> Result<Option<LiveGame>> {
        let Some(info) = self.fetch_active(platform, puuid).await? else {
            return Ok(None);
        };
        let shares = self.store.role_shares().await.unwrap_or_else(|e| {
            warn!(error = %e, "role shares unavailable; lanes guessed without them");
            RoleShares::new()
        });
        Ok(Some(live_game(platform, &info, &shares)))
    }

    /// Check every tracked summoner once and publish `GameStarted` for games
    /// not seen before.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let tracked = self.store.tracked().await.context("listing tracked summoners")?;
        let mut summary = PollSummary::default();
        let mut shares: Option<RoleShares> = None;

        for summoner in tracked {
            summary.checked += 1;
            let Some(platform) = Platform::parse(&summoner.region) else {
                warn!(puuid = %summoner.puuid, region = %summoner.region, "unknown region for tracked summoner");
                summary.errors += 1;
                continue;
            };
            let info = match self.fetch_active(platform, &summoner.puuid).await {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(e) => {
                    warn!(puuid = %summoner.puuid, error = %e, "active game lookup failed");
                    summary.errors += 1;
                    continue;
                }
            };
            summary.in_game += 1;
            if summoner.last_game_id == Some(info.game_id) {
                continue;
            }

            if shares.is_none() {
                shares = Some(self.store.role_shares().await.unwrap_or_else(|e| {
                    warn!(error = %e, "role shares unavailable; lanes guessed without them");
                    RoleShares::new()
                }));
            }
            let game = live_game(platform, &info, shares.as_ref().unwrap_or(&RoleShares::new()));

            if let Err(e) = self.store.record_game(&summoner.puuid, info.game_id).await {
                warn!(puuid = %summoner.puuid, error = %e, "failed to record game id");
                summary.errors += 1;
                continue;
            }
            summary.started += 1;
            info!(puuid = %summoner.puuid, game_id = info.game_id, %platform, "game started");
            let event = LiveEvent::GameStarted {
                puuid: summoner.puuid.clone(),
                game,
            };
            if self.events.send(event).is_err() {
                debug!("no live event subscribers");
            }
        }
        Ok(summary)
    }

    async fn fetch_active(&self, platform: Platform, puuid: &str) -> Result<Option<CurrentGameInfo>> {
        let info = with_rate_limit_retry(self.api.limiter(), MAX_RATE_LIMIT_RETRIES, || {
            self.api.active_game(platform, puuid)
        })
        .await?;
        Ok(info)
    }
}
