use anyhow::{Context, Result};
use riftstats::api::{ApiServer, AppState};
use riftstats::util::db::Db;
use riftstats::scheduler::{Scheduler, SchedulerConfig};
use riftstats::util::env as env_util;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    riftstats::tracing::bootstrap("riftstats")?;

    // --- DB connect ----------------------------------------------------------
    let database_url = env_util::db_url().context("database URL not configured")?;
    let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_conns)
        .await
        .context("Db::connect failed")?;

    let state = AppState::from_env(db).await?;
    let server = ApiServer::from_env()?;
    let scheduler = Scheduler {
        cfg: SchedulerConfig::from_env(),
        aggregations: state.aggregations.clone(),
        seeder: state.seeder.clone(),
        live: state.live.clone(),
    };
    info!(
        cache = state.cache.backend_name(),
        regions = ?state.seeder.config().platforms,
        cfg = ?scheduler.cfg,
        "components ready"
    );

    // --- background loops ----------------------------------------------------
    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let mut tasks = JoinSet::new();
    scheduler.spawn(&mut tasks, &shutdown_tx);

    // --- API + Ctrl+C --------------------------------------------------------
    let mut api = Box::pin(server.run(state, Some(shutdown_tx.subscribe())));
    let finished = tokio::select! {
        res = &mut api => Some(res),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown: Ctrl+C received");
            None
        }
    };

    let _ = shutdown_tx.send(());
    let api_result = match finished {
        Some(res) => res,
        None => api.await,
    };
    if let Err(e) = &api_result {
        error!(error = %e, "api server stopped with an error");
    }

    info!("shutdown: stopping {} task(s)", tasks.len());
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            error!(error = %e, "task join error");
        }
    }
    info!("all tasks stopped");
    api_result
}
