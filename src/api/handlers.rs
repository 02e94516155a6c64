// HTTP request handlers for API endpoints

use actix_web::{web, HttpResponse};
use std::time::Duration;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::*;
use crate::api::state::AppState;
use crate::database_ops::query::{self, BuildQuery};
use crate::riot::history::recent_matches;
use crate::riot::{with_rate_limit_retry, Platform, MAX_RATE_LIMIT_RETRIES};

const DEFAULT_HISTORY: u32 = 10;
const HISTORY_TTL: Duration = Duration::from_secs(120);
const PATCHES_TTL: Duration = Duration::from_secs(300);

fn platform(raw: &str) -> ApiResult<Platform> {
    Platform::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown region '{raw}'")))
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let db_status = if state.db.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        cache: state.cache.backend_name().to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    });
    Ok(HttpResponse::Ok().json(response))
}

/// Win, pick and ban rates for every champion in the filtered bucket.
pub async fn list_champions(
    state: web::Data<AppState>,
    params: web::Query<StatsParams>,
) -> ApiResult<HttpResponse> {
    let filter = params.filter().map_err(ApiError::BadRequest)?;
    let key = format!("champions:{filter:?}");
    if let Some(page) = state.cache.get_json::<query::ChampionStatsPage>(&key).await {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(page)));
    }
    let page = query::champion_stats(&state.db, &filter).await?;
    state.cache.set_json(&key, &page, None).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

/// Rune pages, spell pairs, item builds and archetypes for one champion.
pub async fn champion_builds(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    params: web::Query<BuildParams>,
) -> ApiResult<HttpResponse> {
    let champion_id = path.into_inner();
    if champion_id <= 0 {
        return Err(ApiError::BadRequest(format!("invalid champion id {champion_id}")));
    }
    let mut q = BuildQuery::new(champion_id, params.filter().map_err(ApiError::BadRequest)?);
    if let Some(min_games) = params.min_games {
        q.min_games = min_games.max(1);
    }
    if let Some(limit) = params.limit {
        q.limit = limit.clamp(1, 20);
    }

    let key = format!("builds:{champion_id}:{}:{}:{:?}", q.min_games, q.limit, q.filter);
    if let Some(recs) = state.cache.get_json::<query::BuildRecommendations>(&key).await {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(recs)));
    }
    let recs = query::build_recommendations(&state.db, &q).await?;
    state.cache.set_json(&key, &recs, None).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(recs)))
}

pub async fn list_patches(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    if let Some(patches) = state.cache.get_json::<Vec<String>>("patches").await {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(patches)));
    }
    let patches = query::patches(&state.db).await?;
    state.cache.set_json("patches", &patches, Some(PATCHES_TTL)).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(patches)))
}

/// Account, profile and recent matches for a Riot ID.
pub async fn summoner_profile(
    state: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
    params: web::Query<HistoryParams>,
) -> ApiResult<HttpResponse> {
    let (region, game_name, tag_line) = path.into_inner();
    let platform = platform(&region)?;
    let count = params.count.unwrap_or(DEFAULT_HISTORY);

    let key = format!(
        "summoner:{platform}:{}:{}:{count}",
        game_name.to_lowercase(),
        tag_line.to_lowercase()
    );
    if let Some(profile) = state.cache.get_json::<serde_json::Value>(&key).await {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(profile)));
    }

    let riot = state.riot.as_ref();
    let account = with_rate_limit_retry(riot.limiter(), MAX_RATE_LIMIT_RETRIES, || {
        riot.account_by_riot_id(platform.regional(), &game_name, &tag_line)
    })
    .await?;
    let summoner = with_rate_limit_retry(riot.limiter(), MAX_RATE_LIMIT_RETRIES, || {
        riot.summoner_by_puuid(platform, &account.puuid)
    })
    .await?;
    let matches = recent_matches(riot, platform, &account.puuid, count).await?;

    let profile = SummonerProfile {
        puuid: account.puuid,
        game_name: account.game_name.or(Some(game_name)),
        tag_line: account.tag_line.or(Some(tag_line)),
        region: platform.as_str().to_string(),
        profile_icon_id: summoner.profile_icon_id,
        summoner_level: summoner.summoner_level,
        matches,
    };
    state.cache.set_json(&key, &profile, Some(HISTORY_TTL)).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// The player's current game; `data` is `null` when they are not in one.
pub async fn live_game(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (region, puuid) = path.into_inner();
    let platform = platform(&region)?;
    let game = state
        .live
        .current_game(platform, &puuid)
        .await
        .map_err(ApiError::from_pipeline)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(game)))
}

/// Add a summoner to the live detector's watch list.
pub async fn track_summoner(
    state: web::Data<AppState>,
    body: web::Json<TrackRequest>,
) -> ApiResult<HttpResponse> {
    let req = body.into_inner();
    let platform = platform(&req.region)?;

    let (puuid, game_name, tag_line) = match (req.puuid, req.game_name, req.tag_line) {
        (Some(puuid), name, tag) if !puuid.trim().is_empty() => (puuid, name, tag),
        (_, Some(name), Some(tag)) => {
            let riot = state.riot.as_ref();
            let account = with_rate_limit_retry(riot.limiter(), MAX_RATE_LIMIT_RETRIES, || {
                riot.account_by_riot_id(platform.regional(), &name, &tag)
            })
            .await?;
            (
                account.puuid,
                account.game_name.or(Some(name)),
                account.tag_line.or(Some(tag)),
            )
        }
        _ => {
            return Err(ApiError::BadRequest(
                "either puuid or game_name and tag_line are required".into(),
            ))
        }
    };

    let row = state
        .tracking
        .track(&puuid, platform, game_name.as_deref(), tag_line.as_deref())
        .await?;
    info!(%puuid, %platform, "summoner tracked");
    Ok(HttpResponse::Created().json(ApiResponse::success(row)))
}

pub async fn trigger_seed(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    if !state.seeder.trigger().await {
        return Err(ApiError::Conflict("a seed run is already in progress".into()));
    }
    info!("seed run triggered over http");
    let progress = state.seeder.progress().await;
    Ok(HttpResponse::Accepted().json(ApiResponse::success(progress)))
}

pub async fn seed_status(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let progress = state.seeder.progress().await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(progress)))
}

/// Run an aggregation now and wait for it. `?kind=stats|builds|all`.
pub async fn run_aggregate(
    state: web::Data<AppState>,
    params: web::Query<AggregateParams>,
) -> ApiResult<HttpResponse> {
    match state.aggregations.run(params.kind).await? {
        Some(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(summary))),
        None => Err(ApiError::Conflict("an aggregation is already running".into())),
    }
}
