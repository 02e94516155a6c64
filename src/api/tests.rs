use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{auth::Auth, routes, AppState};
use crate::cache::Cache;
use crate::database_ops::aggregate::{Aggregator, BuildAggregateConfig};
use crate::ingest::seeder::{BatchSeeder, SeedConfig};
use crate::ingest::IngestConfig;
use crate::live::LiveGameDetector;
use crate::scheduler::AggregationRunner;
use crate::testing::{lazy_db, sample_live_game, FakeRiot, MemoryMatchStore, MemoryTracking};

const SECRET: &str = "s3cret";

struct Fixture {
    riot: Arc<FakeRiot>,
    tracking: Arc<MemoryTracking>,
    state: AppState,
}

fn fixture() -> Fixture {
    let riot = Arc::new(FakeRiot::default());
    let tracking = Arc::new(MemoryTracking::default());
    let db = lazy_db();
    let cache = Arc::new(Cache::memory(Duration::from_secs(30)));
    let seeder = Arc::new(BatchSeeder::new(
        riot.clone(),
        Arc::new(MemoryMatchStore::default()),
        IngestConfig::default(),
        SeedConfig {
            platforms: Vec::new(),
            ..SeedConfig::default()
        },
    ));
    let state = AppState {
        db: db.clone(),
        riot: riot.clone(),
        cache: cache.clone(),
        tracking: tracking.clone(),
        seeder,
        aggregations: AggregationRunner::new(
            Aggregator::new(db, BuildAggregateConfig::default()),
            Some(cache),
        ),
        live: Arc::new(LiveGameDetector::new(riot.clone(), tracking.clone())),
        started_at: Instant::now(),
    };
    Fixture {
        riot,
        tracking,
        state,
    }
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .wrap(Auth::new(SECRET))
                .configure(routes::configure_routes),
        )
        .await
    };
}

fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {SECRET}"))
}

#[actix_web::test]
async fn admin_routes_require_the_token() {
    let app = app!(fixture().state);

    let req = test::TestRequest::get().uri("/api/v1/admin/seed/status").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/seed/status")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn seed_status_reports_idle_seeder() {
    let app = app!(fixture().state);
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/seed/status")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["running"], false);
    assert!(body["meta"]["request_id"].is_string());
}

#[actix_web::test]
async fn health_is_public_and_reports_a_down_database() {
    let app = app!(fixture().state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["database"], "disconnected");
    assert_eq!(body["data"]["cache"], "memory");
}

#[actix_web::test]
async fn bad_filters_are_rejected_before_querying() {
    let app = app!(fixture().state);
    for uri in [
        "/api/v1/champions?rank=wood",
        "/api/v1/champions?role=roamer",
        "/api/v1/champions?patch=latest&region=atlantis",
        "/api/v1/champions/103/builds?queue=soloq",
        "/api/v1/champions/0/builds",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[actix_web::test]
async fn unknown_region_is_a_bad_request() {
    let app = app!(fixture().state);
    let req = test::TestRequest::get()
        .uri("/api/v1/summoners/atlantis/Faker/KR1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unknown region 'atlantis'");
}

#[actix_web::test]
async fn summoner_profile_comes_from_riot() {
    let app = app!(fixture().state);
    let req = test::TestRequest::get()
        .uri("/api/v1/summoners/kr/Faker/KR1?count=5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["puuid"], "puuid-Faker-KR1");
    assert_eq!(body["data"]["region"], "kr");
    assert_eq!(body["data"]["profile_icon_id"], 29);
    assert_eq!(body["data"]["matches"], json!([]));
}

#[actix_web::test]
async fn live_endpoint_returns_the_current_game() {
    let fx = fixture();
    fx.riot.set_live_game("me", Some(sample_live_game(4242, "me")));
    let app = app!(fx.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/live/euw/me").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["game_id"], 4242);
    assert_eq!(body["data"]["platform"], "euw1");
    assert_eq!(body["data"]["teams"].as_array().map(Vec::len), Some(2));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/live/euw/nobody").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn track_accepts_puuid_or_riot_id() {
    let fx = fixture();
    let tracking = fx.tracking.clone();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/track")
        .insert_header(bearer())
        .set_json(json!({ "region": "na", "puuid": "abc" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    assert!(tracking.is_tracked("abc"));

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/track")
        .insert_header(bearer())
        .set_json(json!({ "region": "kr", "game_name": "Faker", "tag_line": "KR1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["region"], "kr");
    assert!(tracking.is_tracked("puuid-Faker-KR1"));

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/track")
        .insert_header(bearer())
        .set_json(json!({ "region": "kr", "game_name": "Faker" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn seed_trigger_runs_in_the_background() {
    let fx = fixture();
    let seeder = fx.state.seeder.clone();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/seed/trigger")
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    // No platforms configured, so the run finishes almost at once.
    for _ in 0..50 {
        if !seeder.progress().await.running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let progress = seeder.progress().await;
    assert!(!progress.running);
    assert!(progress.finished_at.is_some());
}
