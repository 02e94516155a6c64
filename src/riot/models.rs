//! Riot API payloads. Only the fields this service reads are modelled; serde
//! ignores the rest. Optional or late-added fields carry `#[serde(default)]`.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntryDto {
    #[serde(default)]
    pub league_id: Option<String>,
    #[serde(default)]
    pub summoner_id: Option<String>,
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub queue_type: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub league_points: i32,
    #[serde(default)]
    pub wins: i32,
    #[serde(default)]
    pub losses: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueListDto {
    #[serde(default)]
    pub league_id: Option<String>,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub queue: String,
    #[serde(default)]
    pub entries: Vec<LeagueItemDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueItemDto {
    #[serde(default)]
    pub summoner_id: Option<String>,
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub league_points: i32,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub wins: i32,
    #[serde(default)]
    pub losses: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerDto {
    #[serde(default)]
    pub id: Option<String>,
    pub puuid: String,
    #[serde(default)]
    pub profile_icon_id: i32,
    #[serde(default)]
    pub summoner_level: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchDto {
    pub metadata: MetadataDto,
    pub info: InfoDto,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDto {
    pub match_id: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDto {
    #[serde(default)]
    pub game_creation: i64,
    /// Seconds when `game_end_timestamp` is present, milliseconds before patch 11.20.
    #[serde(default)]
    pub game_duration: i64,
    #[serde(default)]
    pub game_end_timestamp: Option<i64>,
    #[serde(default)]
    pub game_version: String,
    #[serde(default)]
    pub queue_id: i32,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
    #[serde(default)]
    pub teams: Vec<TeamDto>,
}

impl InfoDto {
    pub fn duration_seconds(&self) -> i64 {
        if self.game_end_timestamp.is_some() {
            self.game_duration
        } else {
            self.game_duration / 1000
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    #[serde(default)]
    pub participant_id: i32,
    #[serde(default)]
    pub puuid: String,
    #[serde(default)]
    pub riot_id_game_name: Option<String>,
    #[serde(default)]
    pub riot_id_tagline: Option<String>,
    pub champion_id: i32,
    #[serde(default)]
    pub champion_name: String,
    pub team_id: i32,
    #[serde(default)]
    pub team_position: String,
    #[serde(default)]
    pub individual_position: String,
    pub win: bool,
    #[serde(default)]
    pub game_ended_in_early_surrender: bool,
    #[serde(default)]
    pub kills: i32,
    #[serde(default)]
    pub deaths: i32,
    #[serde(default)]
    pub assists: i32,
    #[serde(default)]
    pub total_minions_killed: i32,
    #[serde(default)]
    pub neutral_minions_killed: i32,
    #[serde(default)]
    pub gold_earned: i32,
    #[serde(default)]
    pub summoner1_id: i32,
    #[serde(default)]
    pub summoner2_id: i32,
    #[serde(default)]
    pub item0: i32,
    #[serde(default)]
    pub item1: i32,
    #[serde(default)]
    pub item2: i32,
    #[serde(default)]
    pub item3: i32,
    #[serde(default)]
    pub item4: i32,
    #[serde(default)]
    pub item5: i32,
    #[serde(default)]
    pub item6: i32,
    #[serde(default)]
    pub perks: Option<PerksDto>,
}

impl ParticipantDto {
    /// Inventory in slot order; slot 6 is the trinket.
    pub fn items(&self) -> [i32; 7] {
        [
            self.item0, self.item1, self.item2, self.item3, self.item4, self.item5, self.item6,
        ]
    }

    pub fn riot_id(&self) -> Option<String> {
        match (&self.riot_id_game_name, &self.riot_id_tagline) {
            (Some(name), Some(tag)) if !name.is_empty() => Some(format!("{name}#{tag}")),
            (Some(name), _) if !name.is_empty() => Some(name.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerksDto {
    #[serde(default)]
    pub stat_perks: Option<PerkStatsDto>,
    #[serde(default)]
    pub styles: Vec<PerkStyleDto>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PerkStatsDto {
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub flex: i32,
    #[serde(default)]
    pub offense: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerkStyleDto {
    /// `primaryStyle` or `subStyle`.
    #[serde(default)]
    pub description: String,
    pub style: i32,
    #[serde(default)]
    pub selections: Vec<PerkSelectionDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerkSelectionDto {
    pub perk: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    pub team_id: i32,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub bans: Vec<BanDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanDto {
    pub champion_id: i32,
    pub pick_turn: i32,
}

/// spectator-v5 active game.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameInfo {
    pub game_id: i64,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub game_queue_config_id: Option<i32>,
    #[serde(default)]
    pub game_start_time: i64,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub participants: Vec<CurrentGameParticipant>,
    #[serde(default)]
    pub banned_champions: Vec<BannedChampion>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameParticipant {
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub riot_id: Option<String>,
    pub champion_id: i64,
    pub team_id: i64,
    #[serde(default)]
    pub spell1_id: i64,
    #[serde(default)]
    pub spell2_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedChampion {
    pub champion_id: i64,
    pub team_id: i64,
    pub pick_turn: i32,
}
