//! Read side over the derived tables: champion tier lists with counter
//! picks, build recommendations and the patch list.
use anyhow::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use tracing::instrument;

use crate::util::db::Db;
use crate::normalization::{compare_patches, is_wildcard, patch_from_version, Filter, RankBracket, Role};
use crate::riot::Platform;

pub const COUNTER_MIN_GAMES: i64 = 10;
pub const COUNTER_LIMIT: i64 = 6;
pub const DEFAULT_BUILD_MIN_GAMES: i64 = 5;
pub const DEFAULT_BUILD_LIMIT: i64 = 5;
pub const ARCHETYPE_LIMIT: usize = 3;

/// Patch selector. An absent patch means the newest stored patch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PatchFilter {
    #[default]
    Latest,
    All,
    Only(String),
}

impl PatchFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(PatchFilter::Latest);
        };
        if raw.eq_ignore_ascii_case("latest") {
            return Ok(PatchFilter::Latest);
        }
        if is_wildcard(raw) {
            return Ok(PatchFilter::All);
        }
        patch_from_version(raw)
            .map(PatchFilter::Only)
            .ok_or_else(|| format!("invalid patch '{raw}'"))
    }
}

/// Bucket filters shared by every stats query.
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub rank: Filter<RankBracket>,
    pub role: Filter<Role>,
    pub patch: PatchFilter,
    pub region: Filter<Platform>,
    pub queue: Filter<i32>,
}

impl StatsFilter {
    pub fn from_params(
        rank: Option<&str>,
        role: Option<&str>,
        patch: Option<&str>,
        region: Option<&str>,
        queue: Option<&str>,
    ) -> Result<Self, String> {
        Ok(Self {
            rank: Filter::parse_with(rank, RankBracket::normalize)?,
            role: Filter::parse_with(role, Role::normalize)?,
            patch: PatchFilter::parse(patch)?,
            region: Filter::parse_with(region, Platform::parse)?,
            queue: Filter::parse_with(queue, |q| q.parse::<i32>().ok())?,
        })
    }
}

/// Filter values after the patch has been resolved, ready to bind.
#[derive(Debug, Clone, Default, PartialEq)]
struct Scope {
    patch: Option<String>,
    region: Option<String>,
    queue: Option<i32>,
    rank: Option<String>,
}

impl Scope {
    /// `AND col = $n` for every concrete filter, with columns qualified by `alias`.
    fn push(&self, qb: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        if let Some(patch) = &self.patch {
            qb.push(format!(" AND {alias}patch = ")).push_bind(patch.clone());
        }
        if let Some(region) = &self.region {
            qb.push(format!(" AND {alias}region = ")).push_bind(region.clone());
        }
        if let Some(queue) = self.queue {
            qb.push(format!(" AND {alias}queue_id = ")).push_bind(queue);
        }
        if let Some(rank) = &self.rank {
            qb.push(format!(" AND {alias}rank_bracket = ")).push_bind(rank.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterPick {
    pub champion_id: i32,
    pub games: i64,
    /// How often this champion beat the subject in lane, as a percentage.
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChampionStatsView {
    pub champion_id: i32,
    pub games: i64,
    pub wins: i64,
    pub win_rate: f64,
    pub pick_rate: f64,
    pub ban_rate: f64,
    pub counter_picks: Vec<CounterPick>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionStatsPage {
    pub patch: Option<String>,
    pub role: String,
    pub total_matches: i64,
    pub champions: Vec<ChampionStatsView>,
}

/// `num / den` as a percentage in `[0, 100]` rounded to two decimals.
pub fn rate(num: i64, den: i64) -> f64 {
    if den <= 0 || num <= 0 {
        return 0.0;
    }
    round2((num as f64 / den as f64 * 100.0).clamp(0.0, 100.0))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Known patches, newest first.
pub async fn patches(db: &Db) -> Result<Vec<String>> {
    let mut patches: Vec<String> = sqlx::query_scalar("SELECT DISTINCT patch FROM matches")
        .fetch_all(&db.pool)
        .await?;
    patches.sort_by(|a, b| compare_patches(a, b));
    Ok(patches)
}

pub async fn latest_patch(db: &Db) -> Result<Option<String>> {
    Ok(patches(db).await?.into_iter().next())
}

async fn resolve_scope(db: &Db, filter: &StatsFilter) -> Result<Option<Scope>> {
    let patch = match &filter.patch {
        PatchFilter::All => None,
        PatchFilter::Only(p) => Some(p.clone()),
        PatchFilter::Latest => match latest_patch(db).await? {
            Some(p) => Some(p),
            None => return Ok(None),
        },
    };
    Ok(Some(Scope {
        patch,
        region: filter.region.as_option().map(|p| p.as_str().to_string()),
        queue: filter.queue.as_option().copied(),
        rank: filter.rank.as_option().map(|r| r.as_str().to_string()),
    }))
}

/// Champion tier list for the filter, most played first.
#[instrument(skip(db))]
pub async fn champion_stats(db: &Db, filter: &StatsFilter) -> Result<ChampionStatsPage> {
    let role_key = filter
        .role
        .as_option()
        .map(|r| r.as_str())
        .unwrap_or(Role::ALL_KEY)
        .to_string();
    let Some(scope) = resolve_scope(db, filter).await? else {
        return Ok(ChampionStatsPage {
            patch: None,
            role: role_key,
            total_matches: 0,
            champions: Vec::new(),
        });
    };

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "WITH role_rows AS (SELECT champion_id, SUM(games)::BIGINT AS games, SUM(wins)::BIGINT AS wins FROM champion_stats WHERE role = ",
    );
    qb.push_bind(role_key.clone());
    scope.push(&mut qb, "");
    qb.push(
        " GROUP BY champion_id), ban_rows AS (SELECT champion_id, SUM(banned_matches)::BIGINT AS banned FROM champion_stats WHERE role = ",
    );
    qb.push_bind(Role::ALL_KEY);
    scope.push(&mut qb, "");
    qb.push(
        " GROUP BY champion_id), totals AS (SELECT COALESCE(SUM(matches), 0)::BIGINT AS matches FROM bucket_totals WHERE role = ",
    );
    qb.push_bind(Role::ALL_KEY);
    scope.push(&mut qb, "");
    qb.push(
        ") SELECT COALESCE(r.champion_id, b.champion_id) AS champion_id, \
         COALESCE(r.games, 0)::BIGINT AS games, COALESCE(r.wins, 0)::BIGINT AS wins, \
         COALESCE(b.banned, 0)::BIGINT AS banned, t.matches \
         FROM role_rows r FULL JOIN ban_rows b ON b.champion_id = r.champion_id CROSS JOIN totals t \
         WHERE COALESCE(r.games, 0) > 0",
    );
    // Across all roles a champion that was only banned still has a ban rate.
    if filter.role.as_option().is_none() {
        qb.push(" OR COALESCE(b.banned, 0) > 0");
    }
    qb.push(" ORDER BY games DESC, banned DESC, champion_id");

    let rows = qb.build().fetch_all(&db.pool).await?;
    let total_matches: i64 = rows.first().map(|r| r.get("matches")).unwrap_or(0);

    let mut counters = match filter.role.as_option() {
        Some(role) => counter_picks(db, &scope, *role, COUNTER_MIN_GAMES, COUNTER_LIMIT).await?,
        None => HashMap::new(),
    };

    let champions = rows
        .iter()
        .map(|r| {
            let champion_id: i32 = r.get("champion_id");
            let games: i64 = r.get("games");
            let wins: i64 = r.get("wins");
            ChampionStatsView {
                champion_id,
                games,
                wins,
                win_rate: rate(wins, games),
                pick_rate: rate(games, total_matches),
                ban_rate: rate(r.get("banned"), total_matches),
                counter_picks: counters.remove(&champion_id).unwrap_or_default(),
            }
        })
        .collect();

    Ok(ChampionStatsPage {
        patch: scope.patch,
        role: role_key,
        total_matches,
        champions,
    })
}

/// Lane opponents that beat each champion most often, from raw matches.
async fn counter_picks(
    db: &Db,
    scope: &Scope,
    role: Role,
    min_games: i64,
    limit: i64,
) -> Result<HashMap<i32, Vec<CounterPick>>> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "WITH lane AS (SELECT p.match_id, p.team_id, p.champion_id, p.win \
         FROM match_participants p JOIN matches m ON m.match_id = p.match_id WHERE p.role = ",
    );
    qb.push_bind(role.as_str());
    scope.push(&mut qb, "m.");
    qb.push(
        "), pairs AS (SELECT a.champion_id, b.champion_id AS enemy_id, COUNT(*) AS games, \
         SUM(CASE WHEN a.win THEN 0 ELSE 1 END) AS enemy_wins \
         FROM lane a JOIN lane b ON a.match_id = b.match_id AND a.team_id <> b.team_id \
         GROUP BY a.champion_id, b.champion_id HAVING COUNT(*) >= ",
    );
    qb.push_bind(min_games);
    qb.push(
        "), ranked AS (SELECT pairs.*, ROW_NUMBER() OVER (PARTITION BY champion_id \
         ORDER BY enemy_wins::float8 / games DESC, games DESC, enemy_id) AS rn FROM pairs) \
         SELECT champion_id, enemy_id, games, enemy_wins FROM ranked WHERE rn <= ",
    );
    qb.push_bind(limit);
    qb.push(" ORDER BY champion_id, rn");

    let rows = qb.build().fetch_all(&db.pool).await?;
    let mut out: HashMap<i32, Vec<CounterPick>> = HashMap::new();
    for r in rows {
        let games: i64 = r.get("games");
        out.entry(r.get("champion_id")).or_default().push(CounterPick {
            champion_id: r.get("enemy_id"),
            games,
            win_rate: rate(r.get("enemy_wins"), games),
        });
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct BuildQuery {
    pub champion_id: i32,
    pub filter: StatsFilter,
    pub min_games: i64,
    pub limit: i64,
}

impl BuildQuery {
    pub fn new(champion_id: i32, filter: StatsFilter) -> Self {
        Self {
            champion_id,
            filter,
            min_games: DEFAULT_BUILD_MIN_GAMES,
            limit: DEFAULT_BUILD_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunePageView {
    pub perk_signature: String,
    pub primary_style: i32,
    pub sub_style: i32,
    pub keystone: i32,
    pub primary_perks: Vec<i32>,
    pub sub_perks: Vec<i32>,
    pub games: i64,
    pub win_rate: f64,
    pub smoothed_win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpellSetView {
    pub spell1: i32,
    pub spell2: i32,
    pub games: i64,
    pub win_rate: f64,
    pub smoothed_win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemBuildView {
    pub items: Vec<i32>,
    pub games: i64,
    pub win_rate: f64,
    pub smoothed_win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Archetype {
    pub rune_page: RunePageView,
    pub spells: Option<(i32, i32)>,
    pub items: Option<Vec<i32>>,
    /// Participants that used the rune page.
    pub sample: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecommendations {
    pub champion_id: i32,
    pub patch: Option<String>,
    pub rune_pages: Vec<RunePageView>,
    pub spell_sets: Vec<SpellSetView>,
    pub item_builds: Vec<ItemBuildView>,
    pub archetypes: Vec<Archetype>,
}

/// One participant that played a given rune page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageUser {
    pub spells: (i32, i32),
    pub items: Vec<i32>,
}

/// Pair a rune page with the spell pair and item build its players use most.
/// A build counts for a player when all its items are in their inventory.
pub fn assemble_archetype(page: RunePageView, users: &[PageUser], builds: &[ItemBuildView]) -> Archetype {
    let spell_counts = users.iter().map(|u| u.spells).counts();
    let build_counts = users
        .iter()
        .flat_map(|u| {
            builds
                .iter()
                .positions(move |b| b.items.iter().all(|i| u.items.contains(i)))
        })
        .counts();
    // Ties go to the lower spell ids and the better ranked build.
    let spells = spell_counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(pair, _)| pair);
    let items = build_counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(idx, _)| builds[idx].items.clone());
    Archetype {
        rune_page: page,
        spells,
        items,
        sample: users.len(),
    }
}

/// Runes, spells and items for one champion, ranked by smoothed win rate.
#[instrument(skip(db))]
pub async fn build_recommendations(db: &Db, q: &BuildQuery) -> Result<BuildRecommendations> {
    let Some(scope) = resolve_scope(db, &q.filter).await? else {
        return Ok(BuildRecommendations {
            champion_id: q.champion_id,
            patch: None,
            rune_pages: Vec::new(),
            spell_sets: Vec::new(),
            item_builds: Vec::new(),
            archetypes: Vec::new(),
        });
    };
    let role = q.filter.role.as_option().copied();

    let rune_pages = {
        let mut qb = build_select(
            "perk_signature, primary_style, sub_style, keystone, primary_perks, sub_perks",
            "champion_rune_pages",
            q,
            &scope,
            role,
        );
        qb.build()
            .fetch_all(&db.pool)
            .await?
            .iter()
            .map(|r| {
                let games: i64 = r.get("games");
                RunePageView {
                    perk_signature: r.get("perk_signature"),
                    primary_style: r.get("primary_style"),
                    sub_style: r.get("sub_style"),
                    keystone: r.get("keystone"),
                    primary_perks: r.get("primary_perks"),
                    sub_perks: r.get("sub_perks"),
                    games,
                    win_rate: rate(r.get("wins"), games),
                    smoothed_win_rate: round2(r.get::<f64, _>("smoothed") * 100.0),
                }
            })
            .collect::<Vec<_>>()
    };

    let spell_sets = {
        let mut qb = build_select("spell1, spell2", "champion_spell_sets", q, &scope, role);
        qb.build()
            .fetch_all(&db.pool)
            .await?
            .iter()
            .map(|r| {
                let games: i64 = r.get("games");
                SpellSetView {
                    spell1: r.get("spell1"),
                    spell2: r.get("spell2"),
                    games,
                    win_rate: rate(r.get("wins"), games),
                    smoothed_win_rate: round2(r.get::<f64, _>("smoothed") * 100.0),
                }
            })
            .collect::<Vec<_>>()
    };

    let item_builds = {
        let mut qb = build_select("items", "champion_item_builds", q, &scope, role);
        qb.build()
            .fetch_all(&db.pool)
            .await?
            .iter()
            .map(|r| {
                let games: i64 = r.get("games");
                ItemBuildView {
                    items: r.get("items"),
                    games,
                    win_rate: rate(r.get("wins"), games),
                    smoothed_win_rate: round2(r.get::<f64, _>("smoothed") * 100.0),
                }
            })
            .collect::<Vec<_>>()
    };

    let mut archetypes = Vec::new();
    for page in rune_pages.iter().take(ARCHETYPE_LIMIT) {
        let users = page_users(db, q.champion_id, &page.perk_signature, &scope, role).await?;
        archetypes.push(assemble_archetype(page.clone(), &users, &item_builds));
    }

    Ok(BuildRecommendations {
        champion_id: q.champion_id,
        patch: scope.patch,
        rune_pages,
        spell_sets,
        item_builds,
        archetypes,
    })
}

/// Sum a build table across the buckets in scope. The smoothed rate is the
/// games-weighted mean of the per-bucket estimates.
fn build_select<'a>(
    key_cols: &str,
    table: &str,
    q: &BuildQuery,
    scope: &Scope,
    role: Option<Role>,
) -> QueryBuilder<'a, Postgres> {
    let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new(format!(
        "SELECT {key_cols}, SUM(games)::BIGINT AS games, SUM(wins)::BIGINT AS wins, \
         (SUM(smoothed_win_rate * games) / NULLIF(SUM(games), 0))::FLOAT8 AS smoothed \
         FROM {table} WHERE champion_id = "
    ));
    qb.push_bind(q.champion_id);
    if let Some(role) = role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    scope.push(&mut qb, "");
    qb.push(format!(" GROUP BY {key_cols} HAVING SUM(games) >= "));
    qb.push_bind(q.min_games);
    qb.push(" ORDER BY smoothed DESC, games DESC LIMIT ");
    qb.push_bind(q.limit);
    qb
}

async fn page_users(
    db: &Db,
    champion_id: i32,
    perk_signature: &str,
    scope: &Scope,
    role: Option<Role>,
) -> Result<Vec<PageUser>> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT s.spell1, s.spell2, \
         COALESCE(ARRAY_AGG(i.item_id) FILTER (WHERE i.item_id IS NOT NULL), '{}'::INTEGER[]) AS items \
         FROM match_participants p \
         JOIN matches m ON m.match_id = p.match_id \
         JOIN participant_perks k ON k.match_id = p.match_id AND k.participant_id = p.participant_id \
         JOIN participant_spells s ON s.match_id = p.match_id AND s.participant_id = p.participant_id \
         LEFT JOIN participant_final_items i ON i.match_id = p.match_id AND i.participant_id = p.participant_id \
         WHERE p.champion_id = ",
    );
    qb.push_bind(champion_id);
    qb.push(" AND k.perk_signature = ").push_bind(perk_signature.to_string());
    if let Some(role) = role {
        qb.push(" AND p.role = ").push_bind(role.as_str());
    }
    scope.push(&mut qb, "m.");
    qb.push(" GROUP BY p.match_id, p.participant_id, s.spell1, s.spell2 LIMIT 5000");

    let rows = qb.build().fetch_all(&db.pool).await?;
    Ok(rows
        .iter()
        .map(|r| PageUser {
            spells: (r.get("spell1"), r.get("spell2")),
            items: r.get("items"),
        })
        .collect())
}

/// Share of each champion's games per lane, used to guess roles in live games.
pub async fn champion_role_shares(db: &Db, patch: Option<&str>) -> Result<HashMap<i32, HashMap<Role, f64>>> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT champion_id, role, SUM(games)::BIGINT AS games FROM champion_stats WHERE role <> ",
    );
    qb.push_bind(Role::ALL_KEY);
    if let Some(patch) = patch {
        qb.push(" AND patch = ").push_bind(patch.to_string());
    }
    qb.push(" GROUP BY champion_id, role");
    let rows = qb.build().fetch_all(&db.pool).await?;

    let mut games: HashMap<i32, Vec<(Role, i64)>> = HashMap::new();
    for r in rows {
        let role: String = r.get("role");
        if let Some(role) = Role::normalize(&role) {
            games
                .entry(r.get("champion_id"))
                .or_default()
                .push((role, r.get("games")));
        }
    }
    Ok(games
        .into_iter()
        .map(|(champ, per_role)| {
            let total: i64 = per_role.iter().map(|(_, g)| *g).sum();
            let shares = per_role
                .into_iter()
                .map(|(role, g)| (role, if total > 0 { g as f64 / total as f64 } else { 0.0 }))
                .collect();
            (champ, shares)
        })
        .collect())
}
