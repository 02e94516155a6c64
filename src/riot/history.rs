//! Player match history served straight from match-v5.
use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use super::models::MatchDto;
use super::{with_rate_limit_retry, MatchIdsQuery, Platform, RiotApi, RiotError, MAX_RATE_LIMIT_RETRIES};
use crate::normalization::{patch_from_version, Role};

pub const MAX_HISTORY: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub queue_id: i32,
    pub patch: Option<String>,
    /// Epoch millis.
    pub game_creation: i64,
    pub duration_s: i64,
    pub champion_id: i32,
    pub role: Role,
    pub win: bool,
    pub remake: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub kda: f64,
    pub cs: i32,
    pub gold: i32,
    pub spells: (i32, i32),
    pub items: Vec<i32>,
}

/// The row for `puuid` in `dto`, or `None` if they did not play in it.
pub fn summarize(dto: &MatchDto, puuid: &str) -> Option<MatchSummary> {
    let info = &dto.info;
    let p = info.participants.iter().find(|p| p.puuid == puuid)?;
    let kda = if p.deaths == 0 {
        (p.kills + p.assists) as f64
    } else {
        ((p.kills + p.assists) as f64 / p.deaths as f64 * 100.0).round() / 100.0
    };
    Some(MatchSummary {
        match_id: dto.metadata.match_id.clone(),
        queue_id: info.queue_id,
        patch: patch_from_version(&info.game_version),
        game_creation: info.game_creation,
        duration_s: info.duration_seconds(),
        champion_id: p.champion_id,
        role: Role::from_participant(&p.team_position, &p.individual_position),
        win: p.win,
        remake: info.participants.iter().any(|x| x.game_ended_in_early_surrender),
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        kda,
        cs: p.total_minions_killed + p.neutral_minions_killed,
        gold: p.gold_earned,
        spells: (p.summoner1_id, p.summoner2_id),
        items: p.items().into_iter().filter(|i| *i > 0).collect(),
    })
}

/// Most recent matches for `puuid` across all queues, newest first. Matches
/// that fail to load are logged and left out.
pub async fn recent_matches(
    api: &dyn RiotApi,
    platform: Platform,
    puuid: &str,
    count: u32,
) -> Result<Vec<MatchSummary>, RiotError> {
    let regional = platform.regional();
    let query = MatchIdsQuery {
        queue: None,
        start: 0,
        count: count.clamp(1, MAX_HISTORY),
    };
    let ids = with_rate_limit_retry(api.limiter(), MAX_RATE_LIMIT_RETRIES, || {
        api.match_ids_by_puuid(regional, puuid, query)
    })
    .await?;

    let fetched = join_all(ids.iter().map(|id| async move {
        let res = with_rate_limit_retry(api.limiter(), MAX_RATE_LIMIT_RETRIES, || {
            api.match_by_id(regional, id)
        })
        .await;
        (id, res)
    }))
    .await;

    let mut out = Vec::with_capacity(fetched.len());
    for (id, res) in fetched {
        match res {
            Ok(dto) => out.extend(summarize(&dto, puuid)),
            Err(e) => warn!(match_id = %id, error = %e, "failed to load match for history"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_match, FakeRiot};

    #[test]
    fn summary_picks_the_players_row() {
        let dto = sample_match("NA1_7", 1500);
        let s = summarize(&dto, "puuid-NA1_7-2").unwrap();
        assert_eq!(s.role, Role::Jungle);
        assert!(s.win);
        assert_eq!(s.patch.as_deref(), Some("14.3"));
        assert_eq!(s.cs, 192);
        assert_eq!(s.kda, 4.0);
        assert_eq!(s.items, vec![3031, 3006, 6672, 3340]);
        assert!(summarize(&dto, "someone-else").is_none());
    }

    #[tokio::test]
    async fn history_skips_missing_matches() {
        let api = FakeRiot::default();
        api.add_match(sample_match("NA1_1", 1500));
        api.add_match_ids("puuid-NA1_1-6", &["NA1_1", "NA1_404"]);

        let out = recent_matches(&api, Platform::Na1, "puuid-NA1_1-6", 10)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].match_id, "NA1_1");
        assert!(!out[0].win);
    }
}
