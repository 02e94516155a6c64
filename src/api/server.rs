// API server implementation using actix-web

use crate::api::{auth, middleware, routes, AppState};
use crate::util::env::{env_opt, env_parse, env_req};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub api_secret: String,
    pub allowed_origins: String,
    pub workers: usize,
}

impl ApiServer {
    /// `API_HOST`, `API_PORT`, `API_SECRET` (required), `ALLOWED_ORIGINS`, `API_WORKERS`.
    pub fn from_env() -> Result<Self> {
        let api_secret =
            env_req("API_SECRET").context("API_SECRET environment variable is required")?;
        Ok(Self {
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 8080u16),
            api_secret,
            allowed_origins: env_opt("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            workers: env_parse("API_WORKERS", 4usize).max(1),
        })
    }

    /// Serve until the process is interrupted or `shutdown` fires.
    pub async fn run(self, state: AppState, shutdown: Option<broadcast::Receiver<()>>) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        info!(host = %self.host, port = self.port, "starting riftstats API server");

        let data = web::Data::new(state);
        let api_secret = self.api_secret.clone();
        let allowed_origins = self.allowed_origins.clone();

        let server = HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(data.clone())
                .wrap(auth::Auth::new(&api_secret))
                .wrap(cors)
                .wrap(compress)
                .wrap(logger)
                .configure(routes::configure_routes)
        })
        .workers(self.workers)
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run();

        let handle = server.handle();
        if let Some(mut rx) = shutdown {
            tokio::spawn(async move {
                let _ = rx.recv().await;
                info!("api: shutdown");
                handle.stop(true).await;
            });
        }
        server.await.context("HTTP server error")?;
        Ok(())
    }
}
