//! Client-side throttle for the Riot API.
//!
//! A development/personal key allows 20 requests per second and 100 requests
//! per two minutes. The limiter keeps a minimum spacing between requests and a
//! sliding window of request timestamps for the long quota.
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::util::env::env_parse;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum gap between two requests (20 req/s -> 50ms).
    pub request_delay: Duration,
    /// Length of the rolling quota window.
    pub window: Duration,
    /// Requests allowed inside `window`.
    pub window_quota: usize,
    /// Pause between seeding batches.
    pub batch_delay: Duration,
    /// Base delay for 429 backoff; doubled per attempt.
    pub retry_delay: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(50),
            window: Duration::from_secs(120),
            window_quota: 100,
            batch_delay: Duration::from_millis(1000),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            request_delay: Duration::from_millis(env_parse(
                "RIOT_REQUEST_DELAY_MS",
                d.request_delay.as_millis() as u64,
            )),
            window: Duration::from_secs(env_parse("RIOT_WINDOW_SECS", d.window.as_secs())),
            window_quota: env_parse("RIOT_REQUESTS_PER_2MIN", d.window_quota).max(1),
            batch_delay: Duration::from_millis(env_parse(
                "RIOT_BATCH_DELAY_MS",
                d.batch_delay.as_millis() as u64,
            )),
            retry_delay: Duration::from_millis(env_parse(
                "RIOT_RETRY_DELAY_MS",
                d.retry_delay.as_millis() as u64,
            )),
        }
    }
}

#[derive(Debug, Default)]
struct WindowState {
    last_request: Option<Instant>,
    sent: VecDeque<Instant>,
}

impl WindowState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.sent.front() {
            if now.duration_since(*front) >= window {
                self.sent.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    cfg: RateLimitConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.cfg
    }

    /// Sleep until a request may be sent, then record it.
    ///
    /// The state lock is held while sleeping so concurrent callers queue up
    /// behind each other instead of all waking at the same instant.
    pub async fn wait_for_request(&self) {
        let mut state = self.state.lock().await;
        loop {
            let now = Instant::now();
            state.prune(now, self.cfg.window);

            let spacing_wait = state
                .last_request
                .map(|last| (last + self.cfg.request_delay).saturating_duration_since(now))
                .unwrap_or_default();
            let quota_wait = if state.sent.len() >= self.cfg.window_quota {
                state
                    .sent
                    .front()
                    .map(|oldest| (*oldest + self.cfg.window).saturating_duration_since(now))
                    .unwrap_or_default()
            } else {
                Duration::ZERO
            };

            let wait = spacing_wait.max(quota_wait);
            if wait.is_zero() {
                state.last_request = Some(now);
                state.sent.push_back(now);
                return;
            }
            if !quota_wait.is_zero() {
                debug!(
                    wait_ms = wait.as_millis() as u64,
                    in_window = state.sent.len(),
                    "rate limiter: window quota reached"
                );
            }
            sleep(wait).await;
        }
    }

    /// Fixed pause between seeding batches.
    pub async fn wait_for_batch(&self) {
        sleep(self.cfg.batch_delay).await;
    }

    /// Backoff for the given 1-based retry attempt: `retry_delay * 2^(attempt-1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.cfg.retry_delay.saturating_mul(1u32 << exp)
    }

    /// Sleep after a 429. Honors a longer `Retry-After` when Riot sends one.
    /// Returns how long it slept.
    pub async fn handle_rate_limit_error(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
    ) -> Duration {
        let backoff = self.backoff_for(attempt);
        let wait = retry_after.map_or(backoff, |ra| ra.max(backoff));
        warn!(
            attempt,
            wait_ms = wait.as_millis() as u64,
            "riot api rate limited; backing off"
        );
        sleep(wait).await;
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.cfg.window);
        wait
    }

    /// Requests recorded inside the current window.
    pub async fn in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.cfg.window);
        state.sent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(delay_ms: u64, quota: usize, window_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            request_delay: Duration::from_millis(delay_ms),
            window: Duration::from_millis(window_ms),
            window_quota: quota,
            batch_delay: Duration::from_millis(250),
            retry_delay: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_minimum_spacing() {
        let limiter = RateLimiter::new(cfg(50, 100, 120_000));
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait_for_request().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(260));
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_when_window_quota_is_spent() {
        let limiter = RateLimiter::new(cfg(0, 3, 1_000));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait_for_request().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
        limiter.wait_for_request().await;
        assert!(start.elapsed() >= Duration::from_millis(1_000));
        assert!(limiter.in_window().await <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_stay_spaced() {
        let limiter = std::sync::Arc::new(RateLimiter::new(cfg(50, 100, 120_000)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let l = limiter.clone();
                tokio::spawn(async move { l.wait_for_request().await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let limiter = RateLimiter::new(cfg(0, 1, 1));
        assert_eq!(limiter.backoff_for(1), Duration::from_millis(100));
        assert_eq!(limiter.backoff_for(2), Duration::from_millis(200));
        assert_eq!(limiter.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_error_respects_retry_after() {
        let limiter = RateLimiter::new(cfg(0, 10, 1_000));
        let waited = limiter.handle_rate_limit_error(1, None).await;
        assert_eq!(waited, Duration::from_millis(100));
        let waited = limiter
            .handle_rate_limit_error(1, Some(Duration::from_secs(2)))
            .await;
        assert_eq!(waited, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_delay_is_fixed() {
        let limiter = RateLimiter::new(cfg(0, 10, 1_000));
        let start = Instant::now();
        limiter.wait_for_batch().await;
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(start.elapsed() < Duration::from_millis(260));
    }
}
