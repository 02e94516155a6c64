//! Flatten a match-v5 payload into the rows persisted by the match store.
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::IngestConfig;
use crate::normalization::{patch_from_version, RankBracket, Role};
use crate::riot::models::{MatchDto, ParticipantDto, PerksDto};
use crate::riot::Platform;

pub const PLAYERS_PER_MATCH: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    pub match_id: String,
    pub region: String,
    pub queue_id: i32,
    pub patch: String,
    pub rank_bracket: String,
    pub duration_s: i32,
    pub game_version: String,
    pub game_creation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantRow {
    pub participant_id: i16,
    pub puuid: String,
    pub riot_id: Option<String>,
    pub champion_id: i32,
    pub team_id: i16,
    pub role: Role,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub cs: i32,
    pub gold: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BanRow {
    pub team_id: i16,
    pub pick_turn: i16,
    pub champion_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerkRow {
    pub participant_id: i16,
    pub primary_style: i32,
    pub sub_style: i32,
    pub keystone: i32,
    pub primary_perks: Vec<i32>,
    pub sub_perks: Vec<i32>,
    pub stat_offense: i32,
    pub stat_flex: i32,
    pub stat_defense: i32,
    pub perk_signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellRow {
    pub participant_id: i16,
    pub spell1: i32,
    pub spell2: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub participant_id: i16,
    pub slot: i16,
    pub item_id: i32,
}

/// Everything written for one match, in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRows {
    pub match_row: MatchRow,
    pub participants: Vec<ParticipantRow>,
    pub bans: Vec<BanRow>,
    pub perks: Vec<PerkRow>,
    pub spells: Vec<SpellRow>,
    pub items: Vec<ItemRow>,
}

impl MatchRows {
    pub fn row_count(&self) -> usize {
        1 + self.participants.len()
            + self.bans.len()
            + self.perks.len()
            + self.spells.len()
            + self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    WrongQueue { queue_id: i32 },
    Remake,
    TooShort { duration_s: i64 },
    UnknownPatch { game_version: String },
    IncompleteRoster { players: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WrongQueue { queue_id } => write!(f, "queue {queue_id} not ingested"),
            SkipReason::Remake => f.write_str("remake"),
            SkipReason::TooShort { duration_s } => write!(f, "game too short ({duration_s}s)"),
            SkipReason::UnknownPatch { game_version } => {
                write!(f, "unparseable game version '{game_version}'")
            }
            SkipReason::IncompleteRoster { players } => write!(f, "{players} participants"),
        }
    }
}

/// Validate and flatten `dto`. Remakes, other queues and short games are
/// rejected with the reason so callers can log and count them.
pub fn map_match(
    dto: &MatchDto,
    rank_bracket: RankBracket,
    platform: Platform,
    cfg: &IngestConfig,
) -> Result<MatchRows, SkipReason> {
    let info = &dto.info;
    if !cfg.queues.contains(&info.queue_id) {
        return Err(SkipReason::WrongQueue {
            queue_id: info.queue_id,
        });
    }
    if info.participants.len() != PLAYERS_PER_MATCH {
        return Err(SkipReason::IncompleteRoster {
            players: info.participants.len(),
        });
    }
    if info
        .participants
        .iter()
        .any(|p| p.game_ended_in_early_surrender)
    {
        return Err(SkipReason::Remake);
    }
    let duration_s = info.duration_seconds();
    if duration_s < cfg.min_duration_s {
        return Err(SkipReason::TooShort { duration_s });
    }
    let patch = patch_from_version(&info.game_version).ok_or_else(|| SkipReason::UnknownPatch {
        game_version: info.game_version.clone(),
    })?;

    let match_row = MatchRow {
        match_id: dto.metadata.match_id.clone(),
        region: platform.as_str().to_string(),
        queue_id: info.queue_id,
        patch,
        rank_bracket: rank_bracket.as_str().to_string(),
        duration_s: duration_s.clamp(0, i32::MAX as i64) as i32,
        game_version: info.game_version.clone(),
        game_creation: Utc.timestamp_millis_opt(info.game_creation).single(),
    };

    let mut rows = MatchRows {
        match_row,
        participants: Vec::with_capacity(PLAYERS_PER_MATCH),
        bans: Vec::new(),
        perks: Vec::with_capacity(PLAYERS_PER_MATCH),
        spells: Vec::with_capacity(PLAYERS_PER_MATCH),
        items: Vec::new(),
    };

    // Riot's own ids are kept only when they number the roster 1..=10 without
    // repeats; otherwise every player is numbered by position.
    let riot_ids: HashSet<i32> = info
        .participants
        .iter()
        .map(|p| p.participant_id)
        .filter(|id| (1..=PLAYERS_PER_MATCH as i32).contains(id))
        .collect();
    let keep_riot_ids = riot_ids.len() == info.participants.len();

    for (idx, p) in info.participants.iter().enumerate() {
        let participant_id = if keep_riot_ids {
            p.participant_id as i16
        } else {
            idx as i16 + 1
        };
        rows.participants.push(participant_row(participant_id, p));

        if let Some(perk) = p.perks.as_ref().and_then(|perks| perk_row(participant_id, perks)) {
            rows.perks.push(perk);
        }

        let (spell1, spell2) = ordered_pair(p.summoner1_id, p.summoner2_id);
        rows.spells.push(SpellRow {
            participant_id,
            spell1,
            spell2,
        });

        for (slot, item_id) in p.items().into_iter().enumerate() {
            if item_id > 0 {
                rows.items.push(ItemRow {
                    participant_id,
                    slot: slot as i16,
                    item_id,
                });
            }
        }
    }

    for team in &info.teams {
        for ban in &team.bans {
            // -1 marks a skipped ban.
            if ban.champion_id > 0 {
                rows.bans.push(BanRow {
                    team_id: team.team_id as i16,
                    pick_turn: ban.pick_turn as i16,
                    champion_id: ban.champion_id,
                });
            }
        }
    }

    Ok(rows)
}

fn participant_row(participant_id: i16, p: &ParticipantDto) -> ParticipantRow {
    ParticipantRow {
        participant_id,
        puuid: p.puuid.clone(),
        riot_id: p.riot_id(),
        champion_id: p.champion_id,
        team_id: p.team_id as i16,
        role: Role::from_participant(&p.team_position, &p.individual_position),
        win: p.win,
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        cs: p.total_minions_killed + p.neutral_minions_killed,
        gold: p.gold_earned,
    }
}

fn perk_row(participant_id: i16, perks: &PerksDto) -> Option<PerkRow> {
    let primary = perks
        .styles
        .iter()
        .find(|s| s.description == "primaryStyle")
        .or_else(|| perks.styles.first())?;
    let sub = perks
        .styles
        .iter()
        .find(|s| s.description == "subStyle")
        .or_else(|| perks.styles.get(1))?;
    let primary_perks: Vec<i32> = primary.selections.iter().map(|s| s.perk).collect();
    let sub_perks: Vec<i32> = sub.selections.iter().map(|s| s.perk).collect();
    let keystone = *primary_perks.first()?;
    let stats = perks.stat_perks.clone().unwrap_or_default();
    Some(PerkRow {
        participant_id,
        primary_style: primary.style,
        sub_style: sub.style,
        keystone,
        perk_signature: perk_signature(primary.style, &primary_perks, sub.style, &sub_perks),
        primary_perks,
        sub_perks,
        stat_offense: stats.offense,
        stat_flex: stats.flex,
        stat_defense: stats.defense,
    })
}

/// Stable key for a rune page: `primary:p1,p2,p3,p4|sub:s1,s2`.
/// Stat shards are stored separately and do not split pages.
pub fn perk_signature(primary_style: i32, primary: &[i32], sub_style: i32, sub: &[i32]) -> String {
    let join = |perks: &[i32]| {
        perks
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{}:{}|{}:{}",
        primary_style,
        join(primary),
        sub_style,
        join(sub)
    )
}

fn ordered_pair(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
