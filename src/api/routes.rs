// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1")
                .route("/champions", web::get().to(handlers::list_champions))
                .route(
                    "/champions/{champion_id}/builds",
                    web::get().to(handlers::champion_builds),
                )
                .route("/patches", web::get().to(handlers::list_patches))
                .route(
                    "/summoners/{region}/{game_name}/{tag_line}",
                    web::get().to(handlers::summoner_profile),
                )
                .route("/live/{region}/{puuid}", web::get().to(handlers::live_game))
                // Admin (bearer token required)
                .service(
                    web::scope("/admin")
                        .route("/track", web::post().to(handlers::track_summoner))
                        .route("/seed/trigger", web::post().to(handlers::trigger_seed))
                        .route("/seed/status", web::get().to(handlers::seed_status))
                        .route("/aggregate", web::post().to(handlers::run_aggregate)),
                ),
        );
}
