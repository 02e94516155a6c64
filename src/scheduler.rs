//! Background loops: stats aggregation, build aggregation, ladder seeding and
//! live game polling. Every loop stops on the shared shutdown broadcast.
use anyhow::Result;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cache::Cache;
use crate::database_ops::aggregate::{AggregateSummary, Aggregator};
use crate::ingest::seeder::BatchSeeder;
use crate::live::{LiveEvent, LiveGameDetector};
use crate::util::env::env_parse;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub aggregate_every: Duration,
    pub builds_every: Duration,
    /// `None` disables periodic seeding; runs can still be triggered over HTTP.
    pub seed_every: Option<Duration>,
    pub live_poll_every: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            aggregate_every: Duration::from_secs(120),
            builds_every: Duration::from_secs(900),
            seed_every: None,
            live_poll_every: Some(Duration::from_secs(30)),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let secs = |v: u64| (v > 0).then(|| Duration::from_secs(v));
        Self {
            aggregate_every: Duration::from_secs(
                env_parse("AGGREGATE_INTERVAL_SECS", d.aggregate_every.as_secs()).max(1),
            ),
            builds_every: Duration::from_secs(
                env_parse("BUILD_AGGREGATE_INTERVAL_SECS", d.builds_every.as_secs()).max(1),
            ),
            seed_every: secs(env_parse("SEED_INTERVAL_SECS", 0u64)),
            live_poll_every: secs(env_parse("LIVE_POLL_SECS", 30u64)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    #[default]
    Stats,
    Builds,
    All,
}

/// Runs aggregations one at a time. A run requested while another is in
/// flight is skipped rather than queued.
#[derive(Clone)]
pub struct AggregationRunner {
    aggregator: Aggregator,
    lock: Arc<Mutex<()>>,
    cache: Option<Arc<Cache>>,
}

impl AggregationRunner {
    pub fn new(aggregator: Aggregator, cache: Option<Arc<Cache>>) -> Self {
        Self {
            aggregator,
            lock: Arc::new(Mutex::new(())),
            cache,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// `Ok(None)` when another aggregation holds the lock.
    pub async fn run(&self, kind: AggregateKind) -> Result<Option<AggregateSummary>> {
        let Ok(_guard) = self.lock.try_lock() else {
            warn!(?kind, "aggregation already running; skipped");
            return Ok(None);
        };

        let mut summary = AggregateSummary::default();
        if matches!(kind, AggregateKind::Stats | AggregateKind::All) {
            merge(&mut summary, self.aggregator.run().await?);
        }
        if matches!(kind, AggregateKind::Builds | AggregateKind::All) {
            merge(&mut summary, self.aggregator.run_builds().await?);
        }
        if let Some(cache) = &self.cache {
            cache.invalidate_all().await;
        }
        Ok(Some(summary))
    }
}

fn merge(into: &mut AggregateSummary, from: AggregateSummary) {
    into.elapsed_ms += from.elapsed_ms;
    into.steps.extend(from.steps);
}

/// Call `job` now and then once per `period` until shutdown. Ticks missed
/// while a job runs are delayed, not bunched.
pub async fn run_every<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        job().await;
        tokio::select! {
            _ = ticker.tick() => {},
            _ = shutdown.recv() => {
                info!(loop_name = name, "shutdown");
                break;
            }
        }
    }
}

pub struct Scheduler {
    pub cfg: SchedulerConfig,
    pub aggregations: AggregationRunner,
    pub seeder: Arc<BatchSeeder>,
    pub live: Arc<LiveGameDetector>,
}

impl Scheduler {
    /// Spawn every enabled loop onto `tasks`.
    pub fn spawn(&self, tasks: &mut JoinSet<()>, shutdown: &broadcast::Sender<()>) {
        let runner = self.aggregations.clone();
        tasks.spawn(run_every(
            "aggregate",
            self.cfg.aggregate_every,
            shutdown.subscribe(),
            move || {
                let runner = runner.clone();
                async move { log_aggregation("stats", runner.run(AggregateKind::Stats).await) }
            },
        ));

        let runner = self.aggregations.clone();
        let builds_every = self.cfg.builds_every;
        let mut rx = shutdown.subscribe();
        tasks.spawn(async move {
            // Give the first stats pass a head start; builds read its win rates.
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(30).min(builds_every)) => {},
                _ = rx.recv() => return,
            }
            run_every("builds", builds_every, rx, move || {
                let runner = runner.clone();
                async move { log_aggregation("builds", runner.run(AggregateKind::Builds).await) }
            })
            .await;
        });

        if let Some(period) = self.cfg.seed_every {
            let seeder = self.seeder.clone();
            tasks.spawn(run_every("seed", period, shutdown.subscribe(), move || {
                let seeder = seeder.clone();
                async move {
                    if !seeder.trigger().await {
                        info!("seed run still in progress; tick skipped");
                    }
                }
            }));
        } else {
            info!("periodic seeding disabled (SEED_INTERVAL_SECS=0)");
        }

        if let Some(period) = self.cfg.live_poll_every {
            let live = self.live.clone();
            tasks.spawn(run_every("live", period, shutdown.subscribe(), move || {
                let live = live.clone();
                async move {
                    match live.poll_once().await {
                        Ok(s) if s.started > 0 || s.errors > 0 => info!(
                            checked = s.checked,
                            in_game = s.in_game,
                            started = s.started,
                            errors = s.errors,
                            "live poll"
                        ),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "live poll failed"),
                    }
                }
            }));
            tasks.spawn(log_live_events(self.live.subscribe(), shutdown.subscribe()));
        } else {
            info!("live polling disabled (LIVE_POLL_SECS=0)");
        }
    }
}

fn log_aggregation(kind: &'static str, res: Result<Option<AggregateSummary>>) {
    match res {
        Ok(Some(summary)) => info!(
            kind,
            rows = summary.total_rows(),
            elapsed_ms = summary.elapsed_ms,
            "aggregation complete"
        ),
        Ok(None) => {}
        Err(e) => error!(kind, error = %e, "aggregation failed; retrying next interval"),
    }
}

/// Drain live events into the log until shutdown.
pub async fn log_live_events(
    mut events: broadcast::Receiver<LiveEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let started = Instant::now();
    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(LiveEvent::GameStarted { puuid, game }) => info!(
                    %puuid,
                    game_id = game.game_id,
                    platform = %game.platform,
                    queue_id = ?game.queue_id,
                    "GAME_STARTED"
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "live event log lagged"),
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    info!(uptime_s = started.elapsed().as_secs(), "live event log stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::aggregate::BuildAggregateConfig;
    use crate::testing::lazy_db;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn config_defaults() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.aggregate_every, Duration::from_secs(120));
        assert_eq!(cfg.builds_every, Duration::from_secs(900));
        assert!(cfg.seed_every.is_none());
        assert_eq!(cfg.live_poll_every, Some(Duration::from_secs(30)));
    }

    #[test]
    fn aggregate_kind_parses_lowercase() {
        let k: AggregateKind = serde_json::from_str("\"builds\"").unwrap();
        assert_eq!(k, AggregateKind::Builds);
        assert_eq!(AggregateKind::default(), AggregateKind::Stats);
    }

    #[tokio::test]
    async fn busy_runner_skips_without_touching_the_database() {
        let runner = AggregationRunner::new(
            Aggregator::new(lazy_db(), BuildAggregateConfig::default()),
            None,
        );
        let _held = runner.lock.clone().try_lock_owned().unwrap();
        assert!(runner.is_busy());
        assert!(runner.run(AggregateKind::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_run_releases_the_lock() {
        let runner = AggregationRunner::new(
            Aggregator::new(lazy_db(), BuildAggregateConfig::default()),
            None,
        );
        assert!(runner.run(AggregateKind::Stats).await.is_err());
        assert!(!runner.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn run_every_ticks_until_shutdown() {
        let (tx, _) = broadcast::channel(1);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = tokio::spawn(run_every("test", Duration::from_secs(10), tx.subscribe(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        tx.send(()).unwrap();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
