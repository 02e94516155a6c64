// HTTP API only: no aggregation, seeding or live polling loops.

use anyhow::Result;
use riftstats::api::{ApiServer, AppState};
use riftstats::util::db::Db;
use riftstats::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    riftstats::tracing::bootstrap("api_server")?;

    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect_no_migrate(&database_url, max_connections).await?;
    tracing::info!("database connected");

    let state = AppState::from_env(db).await?;
    server.run(state, None).await?;

    Ok(())
}
