use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform routing value (league-v4, summoner-v4, spectator-v5 hosts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Na1,
    Euw1,
    Eun1,
    Kr,
    Jp1,
    Br1,
    La1,
    La2,
    Oc1,
    Tr1,
    Ru,
    Ph2,
    Sg2,
    Th2,
    Tw2,
    Vn2,
    Me1,
}

/// Regional routing value (match-v5, account-v1 hosts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regional {
    Americas,
    Europe,
    Asia,
    Sea,
}

impl Platform {
    pub const ALL: [Platform; 17] = [
        Platform::Na1,
        Platform::Euw1,
        Platform::Eun1,
        Platform::Kr,
        Platform::Jp1,
        Platform::Br1,
        Platform::La1,
        Platform::La2,
        Platform::Oc1,
        Platform::Tr1,
        Platform::Ru,
        Platform::Ph2,
        Platform::Sg2,
        Platform::Th2,
        Platform::Tw2,
        Platform::Vn2,
        Platform::Me1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Na1 => "na1",
            Platform::Euw1 => "euw1",
            Platform::Eun1 => "eun1",
            Platform::Kr => "kr",
            Platform::Jp1 => "jp1",
            Platform::Br1 => "br1",
            Platform::La1 => "la1",
            Platform::La2 => "la2",
            Platform::Oc1 => "oc1",
            Platform::Tr1 => "tr1",
            Platform::Ru => "ru",
            Platform::Ph2 => "ph2",
            Platform::Sg2 => "sg2",
            Platform::Th2 => "th2",
            Platform::Tw2 => "tw2",
            Platform::Vn2 => "vn2",
            Platform::Me1 => "me1",
        }
    }

    /// Accepts platform ids and the short names players use ("euw", "lan").
    pub fn parse(raw: &str) -> Option<Platform> {
        let key = raw.trim().to_ascii_lowercase();
        let platform = match key.as_str() {
            "na1" | "na" => Platform::Na1,
            "euw1" | "euw" => Platform::Euw1,
            "eun1" | "eune" | "eun" => Platform::Eun1,
            "kr" => Platform::Kr,
            "jp1" | "jp" => Platform::Jp1,
            "br1" | "br" => Platform::Br1,
            "la1" | "lan" => Platform::La1,
            "la2" | "las" => Platform::La2,
            "oc1" | "oce" => Platform::Oc1,
            "tr1" | "tr" => Platform::Tr1,
            "ru" | "ru1" => Platform::Ru,
            "ph2" | "ph" => Platform::Ph2,
            "sg2" | "sg" => Platform::Sg2,
            "th2" | "th" => Platform::Th2,
            "tw2" | "tw" => Platform::Tw2,
            "vn2" | "vn" => Platform::Vn2,
            "me1" | "me" => Platform::Me1,
            _ => return None,
        };
        Some(platform)
    }

    pub fn regional(self) -> Regional {
        match self {
            Platform::Na1 | Platform::Br1 | Platform::La1 | Platform::La2 => Regional::Americas,
            Platform::Euw1 | Platform::Eun1 | Platform::Tr1 | Platform::Ru | Platform::Me1 => {
                Regional::Europe
            }
            Platform::Kr | Platform::Jp1 => Regional::Asia,
            Platform::Oc1
            | Platform::Ph2
            | Platform::Sg2
            | Platform::Th2
            | Platform::Tw2
            | Platform::Vn2 => Regional::Sea,
        }
    }

    /// Platform encoded in a match id prefix ("EUW1_6812345678").
    pub fn from_match_id(match_id: &str) -> Option<Platform> {
        match_id.split_once('_').and_then(|(p, _)| Platform::parse(p))
    }
}

impl Regional {
    pub fn as_str(self) -> &'static str {
        match self {
            Regional::Americas => "americas",
            Regional::Europe => "europe",
            Regional::Asia => "asia",
            Regional::Sea => "sea",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Regional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
