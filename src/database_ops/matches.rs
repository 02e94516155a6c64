use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

use crate::util::db::Db;
use crate::ingest::{MatchRows, MatchStore};

/// Raw tables in dependency order, used by `riftctl stats`.
pub const RAW_TABLES: [&str; 6] = [
    "matches",
    "match_participants",
    "match_bans",
    "participant_perks",
    "participant_spells",
    "participant_final_items",
];

pub const DERIVED_TABLES: [&str; 5] = [
    "bucket_totals",
    "champion_stats",
    "champion_rune_pages",
    "champion_spell_sets",
    "champion_item_builds",
];

#[derive(Clone)]
pub struct PgMatchStore {
    pub db: Db,
}

impl PgMatchStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn match_exists(&self, match_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM matches WHERE match_id = $1)")
                .bind(match_id)
                .fetch_one(&self.db.pool)
                .await?;
        Ok(exists)
    }

    #[instrument(skip(self, rows), fields(match_id = %rows.match_row.match_id))]
    async fn insert_match(&self, rows: &MatchRows) -> Result<bool> {
        let m = &rows.match_row;
        let mut tx = self.db.pool.begin().await?;

        let inserted: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO matches (match_id, region, queue_id, patch, rank_bracket, duration_s, game_version, game_creation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (match_id) DO NOTHING
            RETURNING match_id
            "#,
        )
        .bind(&m.match_id)
        .bind(&m.region)
        .bind(m.queue_id)
        .bind(&m.patch)
        .bind(&m.rank_bracket)
        .bind(m.duration_s)
        .bind(&m.game_version)
        .bind(m.game_creation)
        .fetch_optional(&mut *tx)
        .await
        .context("insert match row")?;

        if inserted.is_none() {
            tx.rollback().await?;
            debug!("match row already present; skipping children");
            return Ok(false);
        }

        if !rows.participants.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO match_participants (match_id, participant_id, puuid, riot_id, champion_id, team_id, role, win, kills, deaths, assists, cs, gold) ",
            );
            qb.push_values(rows.participants.iter(), |mut b, p| {
                b.push_bind(&m.match_id)
                    .push_bind(p.participant_id)
                    .push_bind(&p.puuid)
                    .push_bind(&p.riot_id)
                    .push_bind(p.champion_id)
                    .push_bind(p.team_id)
                    .push_bind(p.role.as_str())
                    .push_bind(p.win)
                    .push_bind(p.kills)
                    .push_bind(p.deaths)
                    .push_bind(p.assists)
                    .push_bind(p.cs)
                    .push_bind(p.gold);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .context("insert participants")?;
        }

        if !rows.bans.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO match_bans (match_id, team_id, pick_turn, champion_id) ");
            qb.push_values(rows.bans.iter(), |mut b, ban| {
                b.push_bind(&m.match_id)
                    .push_bind(ban.team_id)
                    .push_bind(ban.pick_turn)
                    .push_bind(ban.champion_id);
            });
            qb.push(" ON CONFLICT DO NOTHING");
            qb.build().execute(&mut *tx).await.context("insert bans")?;
        }

        if !rows.perks.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO participant_perks (match_id, participant_id, primary_style, sub_style, keystone, primary_perks, sub_perks, stat_offense, stat_flex, stat_defense, perk_signature) ",
            );
            qb.push_values(rows.perks.iter(), |mut b, k| {
                b.push_bind(&m.match_id)
                    .push_bind(k.participant_id)
                    .push_bind(k.primary_style)
                    .push_bind(k.sub_style)
                    .push_bind(k.keystone)
                    .push_bind(&k.primary_perks)
                    .push_bind(&k.sub_perks)
                    .push_bind(k.stat_offense)
                    .push_bind(k.stat_flex)
                    .push_bind(k.stat_defense)
                    .push_bind(&k.perk_signature);
            });
            qb.build().execute(&mut *tx).await.context("insert perks")?;
        }

        if !rows.spells.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO participant_spells (match_id, participant_id, spell1, spell2) ",
            );
            qb.push_values(rows.spells.iter(), |mut b, s| {
                b.push_bind(&m.match_id)
                    .push_bind(s.participant_id)
                    .push_bind(s.spell1)
                    .push_bind(s.spell2);
            });
            qb.build().execute(&mut *tx).await.context("insert spells")?;
        }

        if !rows.items.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO participant_final_items (match_id, participant_id, slot, item_id) ",
            );
            qb.push_values(rows.items.iter(), |mut b, i| {
                b.push_bind(&m.match_id)
                    .push_bind(i.participant_id)
                    .push_bind(i.slot)
                    .push_bind(i.item_id);
            });
            qb.build().execute(&mut *tx).await.context("insert items")?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Row counts for every raw and derived table.
pub async fn table_counts(db: &Db) -> Result<Vec<(&'static str, i64)>> {
    let mut out = Vec::with_capacity(RAW_TABLES.len() + DERIVED_TABLES.len());
    for table in RAW_TABLES.iter().chain(DERIVED_TABLES.iter()) {
        // Table names come from the constants above, never from input.
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
            .fetch_one(&db.pool)
            .await
            .with_context(|| format!("counting {table}"))?;
        out.push((*table, row.get::<i64, _>("n")));
    }
    Ok(out)
}

/// Stored matches grouped by patch, newest ingest first.
pub async fn matches_per_patch(db: &Db) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT patch, COUNT(*) AS n, MAX(ingested_at) AS last_ingest
        FROM matches
        GROUP BY patch
        ORDER BY last_ingest DESC
        "#,
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get::<String, _>("patch"), r.get::<i64, _>("n")))
        .collect())
}
