pub mod patch;
pub mod rank;
pub mod role;

pub use patch::{compare_patches, patch_from_version};
pub use rank::{Division, RankBracket, Tier};
pub use role::Role;

/// Query-side filter: a concrete value, or everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Filter<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Filter<T> {
    /// Parse an optional query parameter. Missing, empty, `all`, `any` and
    /// `world` mean [`Filter::All`]; anything else must satisfy `parse`.
    pub fn parse_with<F>(raw: Option<&str>, parse: F) -> Result<Self, String>
    where
        F: FnOnce(&str) -> Option<T>,
    {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Filter::All);
        };
        if is_wildcard(raw) {
            return Ok(Filter::All);
        }
        parse(raw)
            .map(Filter::Only)
            .ok_or_else(|| format!("unrecognised filter value '{raw}'"))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Filter::All => None,
            Filter::Only(v) => Some(v),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }
}

pub fn is_wildcard(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "all" | "any" | "world" | "global" | "*"
    )
}
