//! Response cache for read endpoints. Redis when configured and reachable,
//! otherwise a process-local map. Cache failures are treated as misses.
use dashmap::DashMap;
use rand::Rng;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::util::env::{env_opt, env_parse};

const KEY_PREFIX: &str = "riftstats";
// Shared by every process using the same Redis, so an invalidation by the
// aggregation loop is seen by standalone API servers too.
const GENERATION_KEY: &str = "riftstats:gen";
const MEMORY_SWEEP_AT: usize = 10_000;

enum Backend {
    Redis(ConnectionManager),
    Memory(DashMap<String, (Instant, String)>),
}

pub struct Cache {
    backend: Backend,
    default_ttl: Duration,
    // Memory backend only; Redis keeps its generation under GENERATION_KEY.
    generation: AtomicU64,
}

impl Cache {
    pub fn memory(default_ttl: Duration) -> Self {
        Self {
            backend: Backend::Memory(DashMap::new()),
            default_ttl,
            generation: AtomicU64::new(0),
        }
    }

    /// Connect to `redis_url` if given. Falls back to memory when the URL is
    /// invalid or the server does not answer PING within two seconds.
    pub async fn connect(redis_url: Option<&str>, default_ttl: Duration) -> Self {
        let Some(url) = redis_url else {
            info!("REDIS_URL not set; using in-memory cache");
            return Self::memory(default_ttl);
        };
        match timeout(Duration::from_secs(2), open_redis(url)).await {
            Ok(Ok(conn)) => {
                info!("redis cache connected");
                Self {
                    backend: Backend::Redis(conn),
                    default_ttl,
                    generation: AtomicU64::new(0),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "redis unavailable; using in-memory cache");
                Self::memory(default_ttl)
            }
            Err(_) => {
                warn!("redis connect timed out; using in-memory cache");
                Self::memory(default_ttl)
            }
        }
    }

    /// `REDIS_URL` and `CACHE_TTL_SECS` (default 60).
    pub async fn from_env() -> Self {
        let ttl = Duration::from_secs(env_parse("CACHE_TTL_SECS", 60u64));
        Self::connect(env_opt("REDIS_URL").as_deref(), ttl).await
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Redis(_) => "redis",
            Backend::Memory(_) => "memory",
        }
    }

    /// Current key generation. `None` when Redis cannot be read, in which
    /// case the operation is skipped as a miss.
    async fn generation(&self) -> Option<u64> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let res: redis::RedisResult<Option<u64>> = conn.get(GENERATION_KEY).await;
                match res {
                    Ok(v) => Some(v.unwrap_or(0)),
                    Err(e) => {
                        debug!(error = %e, "redis generation read failed");
                        None
                    }
                }
            }
            Backend::Memory(_) => Some(self.generation.load(Ordering::Relaxed)),
        }
    }

    async fn full_key(&self, key: &str) -> Option<String> {
        let generation = self.generation().await?;
        Some(format!("{KEY_PREFIX}:{generation}:{key}"))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let key = self.full_key(key).await?;
        let raw = match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let res: redis::RedisResult<Option<String>> = conn.get(&key).await;
                match res {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(error = %e, "redis get failed");
                        None
                    }
                }
            }
            Backend::Memory(map) => {
                let hit = map.get(&key).map(|e| e.value().clone());
                match hit {
                    Some((expires, _)) if expires <= Instant::now() => {
                        map.remove(&key);
                        None
                    }
                    Some((_, value)) => Some(value),
                    None => None,
                }
            }
        }?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let Ok(raw) = serde_json::to_string(value) else {
            return;
        };
        let ttl = jittered(ttl.unwrap_or(self.default_ttl));
        let Some(key) = self.full_key(key).await else {
            return;
        };
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let res: redis::RedisResult<()> = conn.set_ex(&key, raw, ttl.as_secs().max(1)).await;
                if let Err(e) = res {
                    debug!(error = %e, "redis set failed");
                }
            }
            Backend::Memory(map) => {
                let now = Instant::now();
                if map.len() >= MEMORY_SWEEP_AT {
                    map.retain(|_, (expires, _)| *expires > now);
                }
                map.insert(key, (now + ttl, raw));
            }
        }
    }

    /// Drop every cached entry, e.g. after an aggregation run. Old Redis
    /// keys are left to expire on their TTL.
    pub async fn invalidate_all(&self) {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let res: redis::RedisResult<u64> = conn.incr(GENERATION_KEY, 1u64).await;
                match res {
                    Ok(generation) => debug!(generation, "cache invalidated"),
                    Err(e) => warn!(error = %e, "redis invalidation failed"),
                }
            }
            Backend::Memory(map) => {
                self.generation.fetch_add(1, Ordering::Relaxed);
                map.clear();
            }
        }
    }
}

/// Stretch a TTL by up to 10% so keys written together do not all expire
/// on the same tick.
fn jittered(ttl: Duration) -> Duration {
    let max_extra = ttl.as_millis() as u64 / 10;
    if max_extra == 0 {
        return ttl;
    }
    ttl + Duration::from_millis(rand::thread_rng().gen_range(0..=max_extra))
}

async fn open_redis(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_connection_manager().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(conn)
}
