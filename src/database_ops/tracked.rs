use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::util::db::Db;

/// A player whose games the live detector watches.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrackedSummoner {
    pub puuid: String,
    pub region: String,
    pub game_name: Option<String>,
    pub tag_line: Option<String>,
    pub last_game_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

pub async fn upsert_tracked(
    db: &Db,
    puuid: &str,
    region: &str,
    game_name: Option<&str>,
    tag_line: Option<&str>,
) -> Result<TrackedSummoner> {
    let row = sqlx::query_as::<_, TrackedSummoner>(
        r#"
        INSERT INTO tracked_summoners (puuid, region, game_name, tag_line)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (puuid) DO UPDATE
           SET region = EXCLUDED.region,
               game_name = COALESCE(EXCLUDED.game_name, tracked_summoners.game_name),
               tag_line = COALESCE(EXCLUDED.tag_line, tracked_summoners.tag_line),
               updated_at = now()
        RETURNING puuid, region, game_name, tag_line, last_game_id, updated_at
        "#,
    )
    .bind(puuid)
    .bind(region)
    .bind(game_name)
    .bind(tag_line)
    .fetch_one(&db.pool)
    .await?;
    Ok(row)
}

pub async fn list_tracked(db: &Db) -> Result<Vec<TrackedSummoner>> {
    let rows = sqlx::query_as::<_, TrackedSummoner>(
        "SELECT puuid, region, game_name, tag_line, last_game_id, updated_at FROM tracked_summoners ORDER BY puuid",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

/// Record the game a summoner was last seen in. Returns `false` when the
/// summoner is no longer tracked.
pub async fn set_last_game_id(db: &Db, puuid: &str, game_id: i64) -> Result<bool> {
    let res = sqlx::query(
        "UPDATE tracked_summoners SET last_game_id = $2, updated_at = now() WHERE puuid = $1",
    )
    .bind(puuid)
    .bind(game_id)
    .execute(&db.pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn remove_tracked(db: &Db, puuid: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM tracked_summoners WHERE puuid = $1")
        .bind(puuid)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
