use serde::{Deserialize, Serialize};
use std::fmt;

/// Ranked tier as reported by league-v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

impl Tier {
    /// Tiers with I..IV divisions, lowest first.
    pub const DIVIDED: [Tier; 7] = [
        Tier::Iron,
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Emerald,
        Tier::Diamond,
    ];

    /// Apex tiers are single leagues without divisions.
    pub const APEX: [Tier; 3] = [Tier::Master, Tier::Grandmaster, Tier::Challenger];

    pub fn as_api_str(self) -> &'static str {
        match self {
            Tier::Iron => "IRON",
            Tier::Bronze => "BRONZE",
            Tier::Silver => "SILVER",
            Tier::Gold => "GOLD",
            Tier::Platinum => "PLATINUM",
            Tier::Emerald => "EMERALD",
            Tier::Diamond => "DIAMOND",
            Tier::Master => "MASTER",
            Tier::Grandmaster => "GRANDMASTER",
            Tier::Challenger => "CHALLENGER",
        }
    }

    pub fn is_apex(self) -> bool {
        Self::APEX.contains(&self)
    }

    pub fn bracket(self) -> RankBracket {
        match self {
            Tier::Iron => RankBracket::Iron,
            Tier::Bronze => RankBracket::Bronze,
            Tier::Silver => RankBracket::Silver,
            Tier::Gold => RankBracket::Gold,
            Tier::Platinum => RankBracket::Platinum,
            Tier::Emerald => RankBracket::Emerald,
            Tier::Diamond => RankBracket::Diamond,
            Tier::Master | Tier::Grandmaster | Tier::Challenger => RankBracket::MasterPlus,
        }
    }

    /// Parse a tier name or common abbreviation ("plat", "gm", "chall").
    pub fn parse(raw: &str) -> Option<Tier> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        let tier = match key.as_str() {
            "iron" | "i" => Tier::Iron,
            "bronze" | "b" => Tier::Bronze,
            "silver" | "s" => Tier::Silver,
            "gold" | "g" => Tier::Gold,
            "platinum" | "plat" | "p" => Tier::Platinum,
            "emerald" | "em" | "e" => Tier::Emerald,
            "diamond" | "dia" | "d" => Tier::Diamond,
            "master" | "masters" | "m" => Tier::Master,
            "grandmaster" | "grandmasters" | "gm" => Tier::Grandmaster,
            "challenger" | "chall" | "c" => Tier::Challenger,
            _ => return None,
        };
        Some(tier)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Division {
    I,
    II,
    III,
    IV,
}

impl Division {
    pub const ALL: [Division; 4] = [Division::I, Division::II, Division::III, Division::IV];

    pub fn as_api_str(self) -> &'static str {
        match self {
            Division::I => "I",
            Division::II => "II",
            Division::III => "III",
            Division::IV => "IV",
        }
    }
}

/// Skill grouping used as a statistics bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBracket {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    MasterPlus,
}

impl RankBracket {
    pub const ALL: [RankBracket; 8] = [
        RankBracket::Iron,
        RankBracket::Bronze,
        RankBracket::Silver,
        RankBracket::Gold,
        RankBracket::Platinum,
        RankBracket::Emerald,
        RankBracket::Diamond,
        RankBracket::MasterPlus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RankBracket::Iron => "iron",
            RankBracket::Bronze => "bronze",
            RankBracket::Silver => "silver",
            RankBracket::Gold => "gold",
            RankBracket::Platinum => "platinum",
            RankBracket::Emerald => "emerald",
            RankBracket::Diamond => "diamond",
            RankBracket::MasterPlus => "master_plus",
        }
    }

    /// Accepts canonical keys, tier names with or without a division
    /// ("GOLD II", "gold_4"), abbreviations, and apex aliases.
    pub fn normalize(raw: &str) -> Option<RankBracket> {
        let lowered = raw.trim().to_ascii_lowercase();
        let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "master_plus" | "masterplus" | "master+" | "masters+" | "apex" | "master_above"
            | "masterandabove" => return Some(RankBracket::MasterPlus),
            _ => {}
        }
        // Strip a trailing division ("ii", "4", "_iv") before matching the tier.
        let head = lowered
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .find(|s| !s.is_empty())?;
        let head = head.trim_end_matches(|c: char| c.is_ascii_digit());
        Tier::parse(head).map(Tier::bracket)
    }
}

impl fmt::Display for RankBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
