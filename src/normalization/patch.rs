/// Reduce a full game version ("14.3.558.106") to its patch ("14.3").
///
/// Returns `None` when the version does not start with two numeric parts.
pub fn patch_from_version(game_version: &str) -> Option<String> {
    let mut parts = game_version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    Some(format!("{major}.{minor}"))
}

/// Order patches newest first ("14.10" sorts after "14.9").
pub fn compare_patches(a: &str, b: &str) -> std::cmp::Ordering {
    fn key(p: &str) -> (u32, u32) {
        let mut it = p.split('.').map(|s| s.parse::<u32>().unwrap_or(0));
        (it.next().unwrap_or(0), it.next().unwrap_or(0))
    }
    key(b).cmp(&key(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_build_numbers() {
        assert_eq!(patch_from_version("14.3.558.106").as_deref(), Some("14.3"));
        assert_eq!(patch_from_version("25.S1.3.123").as_deref(), None);
        assert_eq!(patch_from_version("13.24.1"), Some("13.24".to_string()));
        assert_eq!(patch_from_version("garbage"), None);
    }

    #[test]
    fn leading_zeros_are_dropped() {
        assert_eq!(patch_from_version("14.03.1").as_deref(), Some("14.3"));
    }

    #[test]
    fn patches_sort_numerically() {
        let mut patches = vec!["14.9", "14.10", "13.24", "14.1"];
        patches.sort_by(|a, b| compare_patches(a, b));
        assert_eq!(patches, vec!["14.10", "14.9", "14.1", "13.24"]);
    }
}
