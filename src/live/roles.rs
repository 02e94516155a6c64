//! Lane guesses for spectator data, which carries no positions.
use std::collections::HashMap;

use crate::normalization::Role;

/// Per champion, the share of its games played in each lane.
pub type RoleShares = HashMap<i32, HashMap<Role, f64>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneCandidate {
    pub champion_id: i32,
    pub has_smite: bool,
}

/// Assign lanes to one team. The Smite holder (the one with the highest
/// jungle share if several) takes JUNGLE; the remaining lanes go greedily to
/// the highest champion/lane play share. Players left over get the free lanes
/// in lane order, and anyone past five players is `Unknown`.
pub fn infer_team_roles(players: &[LaneCandidate], shares: &RoleShares) -> Vec<Role> {
    let share = |champion_id: i32, role: Role| -> f64 {
        shares
            .get(&champion_id)
            .and_then(|m| m.get(&role))
            .copied()
            .unwrap_or(0.0)
    };

    let mut assigned: Vec<Option<Role>> = vec![None; players.len()];
    let mut free: Vec<Role> = Role::LANES.to_vec();

    let jungler = players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.has_smite)
        .max_by(|(ia, a), (ib, b)| {
            share(a.champion_id, Role::Jungle)
                .total_cmp(&share(b.champion_id, Role::Jungle))
                .then_with(|| ib.cmp(ia))
        })
        .map(|(idx, _)| idx);
    if let Some(idx) = jungler {
        assigned[idx] = Some(Role::Jungle);
        free.retain(|r| *r != Role::Jungle);
    }

    let mut pairs: Vec<(usize, Role, f64)> = players
        .iter()
        .enumerate()
        .filter(|(idx, _)| assigned[*idx].is_none())
        .flat_map(|(idx, p)| free.iter().map(move |r| (idx, *r, p.champion_id)))
        .map(|(idx, role, champ)| (idx, role, share(champ, role)))
        .filter(|(_, _, s)| *s > 0.0)
        .collect();
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

    for (idx, role, _) in pairs {
        if assigned[idx].is_none() && free.contains(&role) {
            assigned[idx] = Some(role);
            free.retain(|r| *r != role);
        }
    }

    let mut leftover = free.into_iter();
    assigned
        .into_iter()
        .map(|r| r.or_else(|| leftover.next()).unwrap_or(Role::Unknown))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(rows: &[(i32, &[(Role, f64)])]) -> RoleShares {
        rows.iter()
            .map(|(champ, per_role)| (*champ, per_role.iter().copied().collect()))
            .collect()
    }

    fn cand(champion_id: i32, has_smite: bool) -> LaneCandidate {
        LaneCandidate {
            champion_id,
            has_smite,
        }
    }

    #[test]
    fn smite_holder_is_the_jungler() {
        // 266 is usually top, but with Smite it jungles.
        let s = shares(&[(266, &[(Role::Top, 0.9), (Role::Jungle, 0.1)])]);
        let roles = infer_team_roles(&[cand(266, true)], &s);
        assert_eq!(roles, vec![Role::Jungle]);
    }

    #[test]
    fn lanes_follow_play_share() {
        let s = shares(&[
            (266, &[(Role::Top, 0.95)]),
            (64, &[(Role::Jungle, 0.99)]),
            (103, &[(Role::Middle, 0.9), (Role::Bottom, 0.05)]),
            (222, &[(Role::Bottom, 0.98)]),
            (412, &[(Role::Utility, 0.99)]),
        ]);
        let team = [
            cand(412, false),
            cand(222, false),
            cand(64, true),
            cand(103, false),
            cand(266, false),
        ];
        assert_eq!(
            infer_team_roles(&team, &s),
            vec![Role::Utility, Role::Bottom, Role::Jungle, Role::Middle, Role::Top]
        );
    }

    #[test]
    fn contested_lane_goes_to_the_stronger_claim() {
        let s = shares(&[
            (1, &[(Role::Middle, 0.8), (Role::Top, 0.2)]),
            (2, &[(Role::Middle, 0.6), (Role::Top, 0.4)]),
        ]);
        let roles = infer_team_roles(&[cand(2, false), cand(1, false)], &s);
        assert_eq!(roles, vec![Role::Top, Role::Middle]);
    }

    #[test]
    fn unknown_champions_fill_remaining_lanes() {
        let roles = infer_team_roles(
            &[cand(9001, false), cand(9002, false), cand(9003, true)],
            &RoleShares::new(),
        );
        assert_eq!(roles, vec![Role::Top, Role::Middle, Role::Jungle]);
    }

    #[test]
    fn extra_players_are_unknown() {
        let team: Vec<_> = (0..6).map(|i| cand(i, false)).collect();
        let roles = infer_team_roles(&team, &RoleShares::new());
        assert_eq!(roles.len(), 6);
        assert_eq!(roles[5], Role::Unknown);
    }
}
