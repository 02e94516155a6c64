use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::Cache;
use crate::database_ops::aggregate::{Aggregator, BuildAggregateConfig};
use crate::util::db::Db;
use crate::database_ops::matches::PgMatchStore;
use crate::ingest::seeder::{BatchSeeder, SeedConfig};
use crate::ingest::IngestConfig;
use crate::live::{LiveGameDetector, TrackingStore};
use crate::riot::{RateLimitConfig, RateLimiter, RiotApi, RiotClient, RiotConfig};
use crate::scheduler::AggregationRunner;

/// Everything a handler can reach. Shared with the background loops.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub riot: Arc<dyn RiotApi>,
    pub cache: Arc<Cache>,
    pub tracking: Arc<dyn TrackingStore>,
    pub seeder: Arc<BatchSeeder>,
    pub aggregations: AggregationRunner,
    pub live: Arc<LiveGameDetector>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the production components around `db`, `riot` and `cache`, each
    /// configured from the environment.
    pub fn assemble(db: Db, riot: Arc<dyn RiotApi>, cache: Arc<Cache>) -> Self {
        let store = Arc::new(PgMatchStore::new(db.clone()));
        let seeder = Arc::new(BatchSeeder::new(
            riot.clone(),
            store,
            IngestConfig::from_env(),
            SeedConfig::from_env(),
        ));
        let tracking: Arc<dyn TrackingStore> = Arc::new(db.clone());
        let aggregations = AggregationRunner::new(
            Aggregator::new(db.clone(), BuildAggregateConfig::from_env()),
            Some(cache.clone()),
        );
        let live = Arc::new(LiveGameDetector::new(riot.clone(), tracking.clone()));
        Self {
            db,
            riot,
            cache,
            tracking,
            seeder,
            aggregations,
            live,
            started_at: Instant::now(),
        }
    }

    /// [`AppState::assemble`] with a real Riot client and the configured cache.
    pub async fn from_env(db: Db) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::from_env()));
        let riot: Arc<dyn RiotApi> = Arc::new(RiotClient::new(RiotConfig::from_env()?, limiter)?);
        let cache = Arc::new(Cache::from_env().await);
        Ok(Self::assemble(db, riot, cache))
    }
}
