//! Per-client-IP token bucket rate limiting.
//!
//! Each IP gets its own bucket holding up to `capacity` tokens; one token is
//! restored every `interval` (`per / requests`). An admitted request consumes
//! one token. Refill is computed in whole intervals so admission decisions
//! are exact at window boundaries.
//!
//! Locking is two-level: the sharded map is only locked long enough to find
//! or insert a bucket handle, and the consume step runs under that bucket's
//! own mutex. Requests from different IPs never wait on each other.
//!
//! A bucket removed by [`IpRateLimiter::sweep`] is flagged under its mutex
//! before it leaves the map. An `admit` still holding that handle sees the
//! flag and retries against the map, so no token is ever spent on a bucket
//! the map no longer tracks.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
    evicted: bool,
}

#[derive(Debug)]
struct TokenBucket {
    state: Mutex<BucketState>,
}

impl TokenBucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
                evicted: false,
            }),
        }
    }

    /// `None` when the bucket was swept out of the map
    fn try_consume(&self, now: Instant, capacity: u32, interval: Duration) -> Option<bool> {
        let mut state = self.state.lock();
        if state.evicted {
            return None;
        }

        if state.tokens >= capacity {
            // A full bucket accrues nothing
            state.last_refill = now;
        } else {
            let elapsed = now.saturating_duration_since(state.last_refill);
            let earned = elapsed.as_nanos() / interval.as_nanos();
            if earned > 0 {
                let missing = u128::from(capacity - state.tokens);
                if earned >= missing {
                    state.tokens = capacity;
                    state.last_refill = now;
                } else {
                    // earned < capacity, so it fits in u32
                    state.tokens += earned as u32;
                    state.last_refill += interval * earned as u32;
                }
            }
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Flag the bucket as evicted if it has been idle for `window`
    fn evict_if_idle(&self, now: Instant, window: Duration) -> bool {
        let mut state = self.state.lock();
        if now.saturating_duration_since(state.last_refill) >= window {
            state.evicted = true;
        }
        state.evicted
    }
}

/// Admission control keyed by client IP
///
/// Cloning is cheap and clones share the same buckets.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    buckets: Arc<DashMap<String, Arc<TokenBucket>>>,
    capacity: u32,
    interval: Duration,
}

impl IpRateLimiter {
    /// `requests` tokens are restored every `per`, with room for `burst`.
    pub fn new(requests: u32, per: Duration, burst: u32) -> Self {
        let interval = (per / requests.max(1)).max(Duration::from_nanos(1));
        Self {
            buckets: Arc::new(DashMap::new()),
            capacity: burst.max(1),
            interval,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.requests,
            Duration::from_secs(config.per_secs),
            config.burst,
        )
    }

    /// Try to admit one request from `ip`
    pub fn admit(&self, ip: &str) -> bool {
        self.admit_at(ip, Instant::now())
    }

    pub(crate) fn admit_at(&self, ip: &str, now: Instant) -> bool {
        loop {
            let bucket = self.bucket(ip, now);
            if let Some(admitted) = bucket.try_consume(now, self.capacity, self.interval) {
                return admitted;
            }
        }
    }

    fn bucket(&self, ip: &str, now: Instant) -> Arc<TokenBucket> {
        if let Some(bucket) = self.buckets.get(ip) {
            return Arc::clone(bucket.value());
        }
        let entry = self
            .buckets
            .entry(ip.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::full(self.capacity, now)));
        Arc::clone(entry.value())
    }

    /// Time for an empty bucket to refill completely
    pub fn refill_window(&self) -> Duration {
        self.interval * self.capacity
    }

    /// Drop buckets idle for at least [`Self::refill_window`].
    ///
    /// Such a bucket is already full, so forgetting it is indistinguishable
    /// from keeping it. Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let window = self.refill_window();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.evict_if_idle(now, window));
        before.saturating_sub(self.buckets.len())
    }

    /// Run [`Self::sweep`] every `every` until the runtime shuts down
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let evicted = limiter.sweep();
                if evicted > 0 {
                    debug!(evicted, tracked = limiter.len(), "Swept idle rate limit buckets");
                }
            }
        })
    }

    /// Number of tracked IPs
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_limiter() -> IpRateLimiter {
        IpRateLimiter::from_config(&RateLimitConfig::default())
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = signup_limiter();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.1", now));
        }
        assert!(!limiter.admit_at("10.0.0.1", now));
    }

    #[test]
    fn test_admission_resumes_after_window() {
        let limiter = signup_limiter();
        let start = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.1", start));
        }
        assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(1)));

        let later = start + Duration::from_secs(60);
        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.1", later));
        }
        assert!(!limiter.admit_at("10.0.0.1", later));
    }

    #[test]
    fn test_refills_one_token_per_twelve_seconds() {
        let limiter = signup_limiter();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.admit_at("10.0.0.1", start);
        }

        assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(11)));
        assert!(limiter.admit_at("10.0.0.1", start + Duration::from_secs(12)));
        assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(12)));
    }

    #[test]
    fn test_rejection_has_no_side_effects() {
        let limiter = signup_limiter();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.admit_at("10.0.0.1", start);
        }
        // Hammering while empty must not push the next token further out
        for _ in 0..20 {
            assert!(!limiter.admit_at("10.0.0.1", start + Duration::from_secs(6)));
        }
        assert!(limiter.admit_at("10.0.0.1", start + Duration::from_secs(12)));
    }

    #[test]
    fn test_ips_are_independent() {
        let limiter = signup_limiter();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.1", now));
        }
        assert!(!limiter.admit_at("10.0.0.1", now));
        assert!(limiter.admit_at("10.0.0.2", now));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_sweep_evicts_only_idle_buckets() {
        let limiter = signup_limiter();
        let start = Instant::now();

        limiter.admit_at("10.0.0.1", start);
        limiter.admit_at("10.0.0.2", start + Duration::from_secs(30));

        let evicted = limiter.sweep_at(start + Duration::from_secs(60));

        assert_eq!(evicted, 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.buckets.contains_key("10.0.0.2"));
    }

    #[test]
    fn test_handle_held_across_sweep_does_not_grant_extra_token() {
        let limiter = signup_limiter();
        let start = Instant::now();

        limiter.admit_at("10.0.0.1", start);
        // An admit that fetched the handle just before the sweep ran
        let stale = limiter.bucket("10.0.0.1", start);

        let later = start + Duration::from_secs(60);
        assert_eq!(limiter.sweep_at(later), 1);
        assert_eq!(stale.try_consume(later, limiter.capacity, limiter.interval), None);

        // The retry lands on a fresh bucket, so exactly the burst is admitted
        for _ in 0..5 {
            assert!(limiter.admit_at("10.0.0.1", later));
        }
        assert!(!limiter.admit_at("10.0.0.1", later));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_concurrent_admit_and_sweep_never_over_admit() {
        let limiter = signup_limiter();
        let start = Instant::now();
        let later = start + Duration::from_secs(60);
        limiter.admit_at("10.0.0.7", start);

        let admitted: usize = std::thread::scope(|scope| {
            let sweeper = scope.spawn(|| {
                for _ in 0..100 {
                    limiter.sweep_at(later);
                }
            });
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| (0..10).filter(|_| limiter.admit_at("10.0.0.7", later)).count()))
                .collect();
            sweeper.join().unwrap();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        // Whichever of sweep and first admit wins, one burst is granted
        assert_eq!(admitted, 5);
    }

    #[test]
    fn test_refill_window() {
        assert_eq!(signup_limiter().refill_window(), Duration::from_secs(60));
    }

    #[test]
    fn test_concurrent_same_ip_never_over_admits() {
        let limiter = signup_limiter();
        let now = Instant::now();

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = limiter.clone();
                    scope.spawn(move || (0..10).filter(|_| limiter.admit_at("10.0.0.9", now)).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 5);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_task_runs() {
        let limiter = IpRateLimiter::new(1000, Duration::from_millis(1), 1);
        limiter.admit("10.0.0.1");

        let handle = limiter.spawn_sweeper(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(limiter.is_empty());
    }
}
