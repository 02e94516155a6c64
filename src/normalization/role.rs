use serde::{Deserialize, Serialize};
use std::fmt;

/// Lane assignment. `Unknown` only appears on raw participant rows whose
/// position Riot could not determine; it never forms a statistics bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Top,
    Jungle,
    Middle,
    Bottom,
    Utility,
    Unknown,
}

impl Role {
    pub const LANES: [Role; 5] = [Role::Top, Role::Jungle, Role::Middle, Role::Bottom, Role::Utility];

    /// Role key used by `bucket_totals`/`champion_stats` for role-agnostic rows.
    pub const ALL_KEY: &'static str = "ALL";

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Middle => "MIDDLE",
            Role::Bottom => "BOTTOM",
            Role::Utility => "UTILITY",
            Role::Unknown => "UNKNOWN",
        }
    }

    /// Map user input and Riot position strings onto a lane.
    pub fn normalize(raw: &str) -> Option<Role> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let role = match key.as_str() {
            "top" | "toplane" => Role::Top,
            "jungle" | "jg" | "jng" | "jungler" | "jgl" => Role::Jungle,
            "middle" | "mid" | "midlane" => Role::Middle,
            "bottom" | "bot" | "adc" | "ad" | "carry" | "botlane" | "marksman" => Role::Bottom,
            "utility" | "support" | "sup" | "supp" | "sp" => Role::Utility,
            _ => return None,
        };
        Some(role)
    }

    /// Riot fills `teamPosition` for ranked games; `individualPosition` is the
    /// fallback guess. Both can be empty or `Invalid`.
    pub fn from_participant(team_position: &str, individual_position: &str) -> Role {
        Role::normalize(team_position)
            .or_else(|| Role::normalize(individual_position))
            .unwrap_or(Role::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_variants_map_to_one_lane() {
        let cases = [
            ("TOP", Role::Top),
            ("top", Role::Top),
            ("JUNGLE", Role::Jungle),
            ("jg", Role::Jungle),
            ("jng", Role::Jungle),
            ("MIDDLE", Role::Middle),
            ("mid", Role::Middle),
            ("BOTTOM", Role::Bottom),
            ("adc", Role::Bottom),
            ("Bot", Role::Bottom),
            ("UTILITY", Role::Utility),
            ("support", Role::Utility),
            ("supp", Role::Utility),
        ];
        for (raw, expected) in cases {
            assert_eq!(Role::normalize(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn lanes_round_trip_through_their_keys() {
        for lane in Role::LANES {
            assert_eq!(Role::normalize(lane.as_str()), Some(lane));
        }
    }

    #[test]
    fn participant_position_falls_back_then_gives_up() {
        assert_eq!(Role::from_participant("MIDDLE", "TOP"), Role::Middle);
        assert_eq!(Role::from_participant("", "JUNGLE"), Role::Jungle);
        assert_eq!(Role::from_participant("Invalid", "Invalid"), Role::Unknown);
        assert_eq!(Role::from_participant("", ""), Role::Unknown);
    }
}
