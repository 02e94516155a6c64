//! Derived statistics. Every statement recomputes its rows from the raw match
//! tables and upserts them, and each run deletes the rows it did not write,
//! so the derived tables always equal a rebuild from scratch.
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::util::db::Db;
use crate::normalization::Role;
use crate::util::env::env_parse;

/// Trinkets, consumables, starter items and basic boots. None of these say
/// anything about a build, so they never enter the core item pool.
pub const NON_CORE_ITEMS: &[i32] = &[
    // trinkets
    3330, 3340, 3363, 3364, 3513,
    // consumables and elixirs
    2003, 2010, 2031, 2033, 2055, 2138, 2139, 2140, 2150, 2151, 2152,
    // starters and support quest items
    1054, 1055, 1056, 1082, 1083, 1101, 1102, 1103, 1104, 2051, 3070, 3850, 3851, 3853, 3854,
    3855, 3857, 3858, 3859, 3860, 3862, 3863, 3864, 3865, 3866, 3867,
    // basic boots
    1001,
];

#[derive(Debug, Clone)]
pub struct BuildAggregateConfig {
    /// Pseudo-games of the prior blended into every build's win rate.
    pub smoothing_k: f64,
    /// Most frequent completed items per champion/bucket considered "core".
    pub core_pool: i64,
    /// Core items per build signature.
    pub core_items: i64,
    /// Builds seen fewer times than this in a bucket are not stored.
    pub min_games: i64,
}

impl Default for BuildAggregateConfig {
    fn default() -> Self {
        Self {
            smoothing_k: 20.0,
            core_pool: 8,
            core_items: 3,
            min_games: 1,
        }
    }
}

impl BuildAggregateConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            smoothing_k: env_parse("BUILD_SMOOTHING_K", d.smoothing_k).max(0.0),
            core_pool: env_parse("BUILD_CORE_POOL", d.core_pool).max(1),
            core_items: env_parse("BUILD_CORE_ITEMS", d.core_items).max(1),
            min_games: env_parse("BUILD_MIN_GAMES", d.min_games).max(1),
        }
    }
}

/// `(wins + k*prior) / (games + k)`; falls back to the prior with no games.
pub fn smoothed_win_rate(wins: i64, games: i64, prior: f64, k: f64) -> f64 {
    let denom = games as f64 + k;
    if denom <= 0.0 {
        return prior;
    }
    (wins as f64 + k * prior) / denom
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepResult {
    pub step: &'static str,
    pub rows: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateSummary {
    pub steps: Vec<StepResult>,
    pub elapsed_ms: u64,
}

impl AggregateSummary {
    pub fn total_rows(&self) -> u64 {
        self.steps.iter().map(|s| s.rows).sum()
    }
}

const BUCKET_TOTALS_BY_ROLE: &str = r#"
    INSERT INTO bucket_totals (patch, region, queue_id, rank_bracket, role, games, matches, updated_at)
    SELECT m.patch, m.region, m.queue_id, m.rank_bracket, p.role,
           COUNT(*), COUNT(DISTINCT m.match_id), now()
    FROM matches m
    JOIN match_participants p ON p.match_id = m.match_id
    WHERE p.role NOT IN ($1, $2)
    GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, p.role
    ON CONFLICT (patch, region, queue_id, rank_bracket, role) DO UPDATE
       SET games = EXCLUDED.games, matches = EXCLUDED.matches, updated_at = EXCLUDED.updated_at
"#;

const BUCKET_TOTALS_ALL: &str = r#"
    INSERT INTO bucket_totals (patch, region, queue_id, rank_bracket, role, games, matches, updated_at)
    SELECT m.patch, m.region, m.queue_id, m.rank_bracket, $1,
           COUNT(p.participant_id), COUNT(DISTINCT m.match_id), now()
    FROM matches m
    JOIN match_participants p ON p.match_id = m.match_id
    WHERE p.role <> $2
    GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket
    ON CONFLICT (patch, region, queue_id, rank_bracket, role) DO UPDATE
       SET games = EXCLUDED.games, matches = EXCLUDED.matches, updated_at = EXCLUDED.updated_at
"#;

const CHAMPION_STATS_BY_ROLE: &str = r#"
    INSERT INTO champion_stats (patch, region, queue_id, rank_bracket, role, champion_id, games, wins, updated_at)
    SELECT m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id,
           COUNT(*), SUM(CASE WHEN p.win THEN 1 ELSE 0 END), now()
    FROM matches m
    JOIN match_participants p ON p.match_id = m.match_id
    WHERE p.role NOT IN ($1, $2)
    GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id) DO UPDATE
       SET games = EXCLUDED.games, wins = EXCLUDED.wins, updated_at = EXCLUDED.updated_at
"#;

const CHAMPION_STATS_ALL: &str = r#"
    INSERT INTO champion_stats (patch, region, queue_id, rank_bracket, role, champion_id, games, wins, updated_at)
    SELECT m.patch, m.region, m.queue_id, m.rank_bracket, $1, p.champion_id,
           COUNT(*), SUM(CASE WHEN p.win THEN 1 ELSE 0 END), now()
    FROM matches m
    JOIN match_participants p ON p.match_id = m.match_id
    WHERE p.role <> $2
    GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, p.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id) DO UPDATE
       SET games = EXCLUDED.games, wins = EXCLUDED.wins, updated_at = EXCLUDED.updated_at
"#;

// A champion banned by both teams in one match counts once.
const BANS_INTO_ALL: &str = r#"
    INSERT INTO champion_stats (patch, region, queue_id, rank_bracket, role, champion_id, games, wins, banned_matches, updated_at)
    SELECT m.patch, m.region, m.queue_id, m.rank_bracket, $1, b.champion_id,
           0, 0, COUNT(DISTINCT m.match_id), now()
    FROM matches m
    JOIN match_bans b ON b.match_id = m.match_id
    GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, b.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id) DO UPDATE
       SET banned_matches = EXCLUDED.banned_matches, updated_at = EXCLUDED.updated_at
"#;

const BANS_ONTO_ROLES: &str = r#"
    UPDATE champion_stats cs
       SET banned_matches = a.banned_matches, updated_at = now()
      FROM champion_stats a
     WHERE a.role = $1
       AND cs.role NOT IN ($1, $2)
       AND cs.patch = a.patch AND cs.region = a.region AND cs.queue_id = a.queue_id
       AND cs.rank_bracket = a.rank_bracket AND cs.champion_id = a.champion_id
       AND cs.banned_matches IS DISTINCT FROM a.banned_matches
"#;

/// Core stats steps in execution order: `(name, sql, binds_unknown_role)`.
/// Every statement binds the `ALL` role key as `$1`; those flagged also bind
/// the unknown role key as `$2`. Participants without a role only count in
/// ban totals.
pub const STATS_STEPS: [(&str, &str, bool); 6] = [
    ("bucket_totals_by_role", BUCKET_TOTALS_BY_ROLE, true),
    ("bucket_totals_all", BUCKET_TOTALS_ALL, true),
    ("champion_stats_by_role", CHAMPION_STATS_BY_ROLE, true),
    ("champion_stats_all", CHAMPION_STATS_ALL, true),
    ("bans_into_all", BANS_INTO_ALL, false),
    ("bans_onto_roles", BANS_ONTO_ROLES, true),
];

// Build statements bind: $1 smoothing k, $2 min games, $3 unknown role key.
// The prior is the champion's win rate in the same bucket and role.
const RUNE_PAGES: &str = r#"
    WITH pages AS (
        SELECT m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id,
               k.perk_signature, k.primary_style, k.sub_style, k.keystone, k.primary_perks, k.sub_perks,
               COUNT(*) AS games, SUM(CASE WHEN p.win THEN 1 ELSE 0 END) AS wins
        FROM matches m
        JOIN match_participants p ON p.match_id = m.match_id
        JOIN participant_perks k ON k.match_id = p.match_id AND k.participant_id = p.participant_id
        WHERE p.role <> $3
        GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id,
                 k.perk_signature, k.primary_style, k.sub_style, k.keystone, k.primary_perks, k.sub_perks
        HAVING COUNT(*) >= $2
    )
    INSERT INTO champion_rune_pages (patch, region, queue_id, rank_bracket, role, champion_id,
        perk_signature, primary_style, sub_style, keystone, primary_perks, sub_perks,
        games, wins, smoothed_win_rate, updated_at)
    SELECT pg.patch, pg.region, pg.queue_id, pg.rank_bracket, pg.role, pg.champion_id,
           pg.perk_signature, pg.primary_style, pg.sub_style, pg.keystone, pg.primary_perks, pg.sub_perks,
           pg.games, pg.wins,
           (pg.wins + $1 * COALESCE(cs.wins::float8 / NULLIF(cs.games, 0), 0.5)) / (pg.games + $1),
           now()
    FROM pages pg
    LEFT JOIN champion_stats cs
           ON cs.patch = pg.patch AND cs.region = pg.region AND cs.queue_id = pg.queue_id
          AND cs.rank_bracket = pg.rank_bracket AND cs.role = pg.role AND cs.champion_id = pg.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id, perk_signature) DO UPDATE
       SET games = EXCLUDED.games, wins = EXCLUDED.wins,
           smoothed_win_rate = EXCLUDED.smoothed_win_rate, updated_at = EXCLUDED.updated_at
"#;

const SPELL_SETS: &str = r#"
    WITH sets AS (
        SELECT m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id,
               s.spell1, s.spell2,
               COUNT(*) AS games, SUM(CASE WHEN p.win THEN 1 ELSE 0 END) AS wins
        FROM matches m
        JOIN match_participants p ON p.match_id = m.match_id
        JOIN participant_spells s ON s.match_id = p.match_id AND s.participant_id = p.participant_id
        WHERE p.role <> $3
        GROUP BY m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id, s.spell1, s.spell2
        HAVING COUNT(*) >= $2
    )
    INSERT INTO champion_spell_sets (patch, region, queue_id, rank_bracket, role, champion_id,
        spell1, spell2, games, wins, smoothed_win_rate, updated_at)
    SELECT ss.patch, ss.region, ss.queue_id, ss.rank_bracket, ss.role, ss.champion_id,
           ss.spell1, ss.spell2, ss.games, ss.wins,
           (ss.wins + $1 * COALESCE(cs.wins::float8 / NULLIF(cs.games, 0), 0.5)) / (ss.games + $1),
           now()
    FROM sets ss
    LEFT JOIN champion_stats cs
           ON cs.patch = ss.patch AND cs.region = ss.region AND cs.queue_id = ss.queue_id
          AND cs.rank_bracket = ss.rank_bracket AND cs.role = ss.role AND cs.champion_id = ss.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id, spell1, spell2) DO UPDATE
       SET games = EXCLUDED.games, wins = EXCLUDED.wins,
           smoothed_win_rate = EXCLUDED.smoothed_win_rate, updated_at = EXCLUDED.updated_at
"#;

// Extra binds: $4 excluded item ids, $5 core pool size, $6 core items per build.
// Participants owning fewer than $6 core items have no build signature.
const ITEM_BUILDS: &str = r#"
    WITH owned AS (
        SELECT DISTINCT m.patch, m.region, m.queue_id, m.rank_bracket, p.role, p.champion_id,
               p.match_id, p.participant_id, p.win, i.item_id
        FROM matches m
        JOIN match_participants p ON p.match_id = m.match_id
        JOIN participant_final_items i ON i.match_id = p.match_id AND i.participant_id = p.participant_id
        WHERE p.role <> $3 AND i.slot < 6 AND NOT (i.item_id = ANY($4))
    ),
    item_freq AS (
        SELECT patch, region, queue_id, rank_bracket, role, champion_id, item_id, COUNT(*) AS cnt
        FROM owned
        GROUP BY patch, region, queue_id, rank_bracket, role, champion_id, item_id
    ),
    core AS (
        SELECT f.*,
               ROW_NUMBER() OVER (
                   PARTITION BY patch, region, queue_id, rank_bracket, role, champion_id
                   ORDER BY cnt DESC, item_id
               ) AS core_rank
        FROM item_freq f
    ),
    picked AS (
        SELECT o.patch, o.region, o.queue_id, o.rank_bracket, o.role, o.champion_id,
               o.match_id, o.participant_id, o.win, o.item_id,
               ROW_NUMBER() OVER (
                   PARTITION BY o.match_id, o.participant_id
                   ORDER BY c.core_rank
               ) AS owned_rank
        FROM owned o
        JOIN core c
          ON c.patch = o.patch AND c.region = o.region AND c.queue_id = o.queue_id
         AND c.rank_bracket = o.rank_bracket AND c.role = o.role
         AND c.champion_id = o.champion_id AND c.item_id = o.item_id
        WHERE c.core_rank <= $5
    ),
    builds AS (
        SELECT patch, region, queue_id, rank_bracket, role, champion_id, match_id, participant_id,
               BOOL_OR(win) AS win,
               ARRAY_AGG(item_id ORDER BY item_id) AS items
        FROM picked
        WHERE owned_rank <= $6
        GROUP BY patch, region, queue_id, rank_bracket, role, champion_id, match_id, participant_id
        HAVING COUNT(*) = $6
    ),
    grouped AS (
        SELECT patch, region, queue_id, rank_bracket, role, champion_id, items,
               ARRAY_TO_STRING(items, '-') AS item_signature,
               COUNT(*) AS games, SUM(CASE WHEN win THEN 1 ELSE 0 END) AS wins
        FROM builds
        GROUP BY patch, region, queue_id, rank_bracket, role, champion_id, items
        HAVING COUNT(*) >= $2
    )
    INSERT INTO champion_item_builds (patch, region, queue_id, rank_bracket, role, champion_id,
        item_signature, items, games, wins, smoothed_win_rate, updated_at)
    SELECT g.patch, g.region, g.queue_id, g.rank_bracket, g.role, g.champion_id,
           g.item_signature, g.items, g.games, g.wins,
           (g.wins + $1 * COALESCE(cs.wins::float8 / NULLIF(cs.games, 0), 0.5)) / (g.games + $1),
           now()
    FROM grouped g
    LEFT JOIN champion_stats cs
           ON cs.patch = g.patch AND cs.region = g.region AND cs.queue_id = g.queue_id
          AND cs.rank_bracket = g.rank_bracket AND cs.role = g.role AND cs.champion_id = g.champion_id
    ON CONFLICT (patch, region, queue_id, rank_bracket, role, champion_id, item_signature) DO UPDATE
       SET games = EXCLUDED.games, wins = EXCLUDED.wins, items = EXCLUDED.items,
           smoothed_win_rate = EXCLUDED.smoothed_win_rate, updated_at = EXCLUDED.updated_at
"#;

pub const STATS_TABLES: [&str; 2] = ["bucket_totals", "champion_stats"];
pub const BUILD_TABLES: [&str; 3] = [
    "champion_rune_pages",
    "champion_spell_sets",
    "champion_item_builds",
];

/// Delete every row in `tables` that this transaction did not write.
/// `now()` is the transaction start time, so rows upserted above carry
/// exactly that timestamp and older ones are left over from earlier inputs
/// (a build signature whose core items shifted, a page under a raised
/// minimum).
async fn prune_stale(
    tx: &mut Transaction<'_, Postgres>,
    tables: &[&'static str],
) -> Result<StepResult> {
    let t = Instant::now();
    let mut rows = 0;
    for table in tables {
        let res = sqlx::query(&format!("DELETE FROM {table} WHERE updated_at < now()"))
            .execute(&mut **tx)
            .await
            .with_context(|| format!("pruning {table}"))?;
        rows += res.rows_affected();
    }
    Ok(StepResult {
        step: "prune_stale",
        rows,
        elapsed_ms: t.elapsed().as_millis() as u64,
    })
}

#[derive(Clone)]
pub struct Aggregator {
    pub db: Db,
    pub builds: BuildAggregateConfig,
}

impl Aggregator {
    pub fn new(db: Db, builds: BuildAggregateConfig) -> Self {
        Self { db, builds }
    }

    /// Bucket totals, champion stats and ban counts. Readers see either the
    /// previous rows or the new ones, never a mix.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<AggregateSummary> {
        let started = Instant::now();
        let mut summary = AggregateSummary::default();
        let mut tx = self.db.pool.begin().await.context("begin stats aggregation")?;
        for (step, sql, binds_unknown) in STATS_STEPS {
            let t = Instant::now();
            let mut query = sqlx::query(sql).bind(Role::ALL_KEY);
            if binds_unknown {
                query = query.bind(Role::Unknown.as_str());
            }
            let res = query
                .execute(&mut *tx)
                .await
                .with_context(|| format!("aggregate step {step}"))?;
            let elapsed_ms = t.elapsed().as_millis() as u64;
            debug!(step, rows = res.rows_affected(), elapsed_ms, "aggregate step done");
            summary.steps.push(StepResult {
                step,
                rows: res.rows_affected(),
                elapsed_ms,
            });
        }
        summary.steps.push(prune_stale(&mut tx, &STATS_TABLES).await?);
        tx.commit().await.context("commit stats aggregation")?;

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            rows = summary.total_rows(),
            elapsed_ms = summary.elapsed_ms,
            "champion stats aggregated"
        );
        Ok(summary)
    }

    /// Rune pages, spell sets and item builds. Reads the champion win rates
    /// written by [`Aggregator::run`] as the smoothing prior.
    #[instrument(skip(self))]
    pub async fn run_builds(&self) -> Result<AggregateSummary> {
        let started = Instant::now();
        let cfg = &self.builds;
        let mut summary = AggregateSummary::default();
        let mut tx = self.db.pool.begin().await.context("begin build aggregation")?;

        for (step, sql) in [("rune_pages", RUNE_PAGES), ("spell_sets", SPELL_SETS)] {
            let t = Instant::now();
            let res = sqlx::query(sql)
                .bind(cfg.smoothing_k)
                .bind(cfg.min_games)
                .bind(Role::Unknown.as_str())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("build step {step}"))?;
            summary.steps.push(StepResult {
                step,
                rows: res.rows_affected(),
                elapsed_ms: t.elapsed().as_millis() as u64,
            });
        }

        let t = Instant::now();
        let res = sqlx::query(ITEM_BUILDS)
            .bind(cfg.smoothing_k)
            .bind(cfg.min_games)
            .bind(Role::Unknown.as_str())
            .bind(NON_CORE_ITEMS)
            .bind(cfg.core_pool)
            .bind(cfg.core_items)
            .execute(&mut *tx)
            .await
            .context("build step item_builds")?;
        summary.steps.push(StepResult {
            step: "item_builds",
            rows: res.rows_affected(),
            elapsed_ms: t.elapsed().as_millis() as u64,
        });
        summary.steps.push(prune_stale(&mut tx, &BUILD_TABLES).await?);
        tx.commit().await.context("commit build aggregation")?;

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            rows = summary.total_rows(),
            elapsed_ms = summary.elapsed_ms,
            "build stats aggregated"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::matches::{PgMatchStore, DERIVED_TABLES};
    use crate::testing::{derived_snapshot, sample_match, scratch_db, set_items, store_gold_match};

    #[test]
    fn smoothing_pulls_small_samples_toward_prior() {
        // 3/3 wins with k=20 and a 50% prior is far from 100%.
        let wr = smoothed_win_rate(3, 3, 0.5, 20.0);
        assert!((wr - 13.0 / 23.0).abs() < 1e-9);
        // Large samples converge on the raw rate.
        let wr = smoothed_win_rate(6_000, 10_000, 0.5, 20.0);
        assert!((wr - 0.6).abs() < 0.001);
        assert_eq!(smoothed_win_rate(0, 0, 0.47, 0.0), 0.47);
        assert!((smoothed_win_rate(0, 0, 0.47, 20.0) - 0.47).abs() < 1e-12);
    }

    #[test]
    fn stats_steps_write_roles_before_copying_bans() {
        let names: Vec<&str> = STATS_STEPS.iter().map(|(n, _, _)| *n).collect();
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("champion_stats_by_role") < pos("bans_onto_roles"));
        assert!(pos("bans_into_all") < pos("bans_onto_roles"));
        assert_eq!(names.last(), Some(&"bans_onto_roles"));
    }

    #[test]
    fn every_statement_is_an_upsert_or_update() {
        for (name, sql, binds_unknown) in STATS_STEPS {
            assert_eq!(sql.contains("$2"), binds_unknown, "{name} binds");
            assert!(
                sql.contains("ON CONFLICT") || sql.trim_start().starts_with("UPDATE"),
                "{name} is not idempotent"
            );
        }
        for sql in [RUNE_PAGES, SPELL_SETS, ITEM_BUILDS] {
            assert!(sql.contains("DO UPDATE"));
        }
    }

    #[test]
    fn trinkets_never_count_as_core_items() {
        for trinket in [3340, 3363, 3364] {
            assert!(NON_CORE_ITEMS.contains(&trinket));
        }
        assert!(!NON_CORE_ITEMS.contains(&3031));
    }

    fn small_pool() -> BuildAggregateConfig {
        BuildAggregateConfig {
            smoothing_k: 20.0,
            core_pool: 3,
            core_items: 3,
            min_games: 1,
        }
    }

    async fn aggregate_all(agg: &Aggregator) {
        agg.run().await.unwrap();
        agg.run_builds().await.unwrap();
    }

    async fn item_signatures(db: &Db, champion_id: i32) -> Vec<(String, i64)> {
        sqlx::query_as(
            "SELECT item_signature, games FROM champion_item_builds \
             WHERE champion_id = $1 AND role = 'TOP' ORDER BY item_signature",
        )
        .bind(champion_id)
        .fetch_all(&db.pool)
        .await
        .unwrap()
    }

    async fn count_rows(db: &Db, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn aggregating_twice_yields_identical_rows() {
        let Some(scratch) = scratch_db().await else {
            return;
        };
        let store = PgMatchStore::new(scratch.db.clone());
        for id in ["EUW1_910", "EUW1_911", "EUW1_912"] {
            store_gold_match(&store, &sample_match(id, 1800)).await;
        }
        let agg = Aggregator::new(scratch.db.clone(), small_pool());

        aggregate_all(&agg).await;
        let first = derived_snapshot(&scratch.db).await;
        assert!(!first.is_empty());
        aggregate_all(&agg).await;
        assert_eq!(derived_snapshot(&scratch.db).await, first);
    }

    #[tokio::test]
    async fn incremental_builds_match_a_rebuild_from_scratch() {
        let Some(scratch) = scratch_db().await else {
            return;
        };
        let store = PgMatchStore::new(scratch.db.clone());
        let agg = Aggregator::new(scratch.db.clone(), small_pool());

        store_gold_match(&store, &sample_match("EUW1_920", 1800)).await;
        aggregate_all(&agg).await;
        assert_eq!(
            item_signatures(&scratch.db, 266).await,
            vec![("3006-3031-6672".to_string(), 1)]
        );

        // Two later games push a different trio into the core pool, so the
        // first game no longer has a full core build.
        for id in ["EUW1_921", "EUW1_922"] {
            let mut dto = sample_match(id, 1800);
            set_items(&mut dto, [3071, 3053, 3074]);
            store_gold_match(&store, &dto).await;
        }
        aggregate_all(&agg).await;
        let incremental = derived_snapshot(&scratch.db).await;
        assert_eq!(
            item_signatures(&scratch.db, 266).await,
            vec![("3053-3071-3074".to_string(), 2)]
        );

        for table in DERIVED_TABLES {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&scratch.db.pool)
                .await
                .unwrap();
        }
        aggregate_all(&agg).await;
        assert_eq!(derived_snapshot(&scratch.db).await, incremental);
    }

    #[tokio::test]
    async fn raising_min_games_drops_rows_below_it() {
        let Some(scratch) = scratch_db().await else {
            return;
        };
        let store = PgMatchStore::new(scratch.db.clone());
        store_gold_match(&store, &sample_match("EUW1_930", 1800)).await;
        aggregate_all(&Aggregator::new(scratch.db.clone(), small_pool())).await;

        assert_eq!(count_rows(&scratch.db, "champion_rune_pages").await, 10);
        assert_eq!(count_rows(&scratch.db, "champion_spell_sets").await, 10);

        let strict = BuildAggregateConfig {
            min_games: 2,
            ..small_pool()
        };
        aggregate_all(&Aggregator::new(scratch.db.clone(), strict)).await;
        assert_eq!(count_rows(&scratch.db, "champion_rune_pages").await, 0);
        assert_eq!(count_rows(&scratch.db, "champion_spell_sets").await, 0);
    }

    #[test]
    fn build_config_defaults() {
        let cfg = BuildAggregateConfig::default();
        assert_eq!(cfg.smoothing_k, 20.0);
        assert_eq!(cfg.core_pool, 8);
        assert_eq!(cfg.core_items, 3);
    }
}
