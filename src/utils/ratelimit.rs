//! In-process rate limiter whose cooldown grows while a user keeps spamming.

use dashmap::DashMap;
use rand::Rng;
use std::time::{Duration, Instant};

use crate::models::{Context, Error};
use crate::utils::messages::format_error;

/// Bucket count above which expired buckets are dropped on the next check
const PURGE_THRESHOLD: usize = 10_000;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub allowed: bool,
    /// Uses left in the current window
    pub remaining: u32,
    /// Time until the window resets
    pub wait: Duration,
    /// Rejected tries in the current window
    pub triggers: u32,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    used: u32,
    triggers: u32,
    reset_at: Instant,
}

pub struct IncreasingRateLimiter {
    limit: u32,
    cooldown: Duration,
    max_cooldown: Duration,
    spam_tolerance: u32,
    random_increment: bool,
    prefix: String,
    buckets: DashMap<String, Bucket>,
}

pub struct IncreasingRateLimiterBuilder {
    limit: u32,
    cooldown: Duration,
    max_cooldown: Duration,
    spam_tolerance: u32,
    random_increment: bool,
    prefix: String,
}

impl IncreasingRateLimiterBuilder {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn max_cooldown(mut self, max_cooldown: Duration) -> Self {
        self.max_cooldown = max_cooldown;
        self
    }

    pub fn spam_tolerance(mut self, spam_tolerance: u32) -> Self {
        self.spam_tolerance = spam_tolerance;
        self
    }

    pub fn random_increment(mut self, random_increment: bool) -> Self {
        self.random_increment = random_increment;
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn build(self) -> IncreasingRateLimiter {
        IncreasingRateLimiter {
            limit: self.limit,
            cooldown: self.cooldown,
            max_cooldown: self.max_cooldown.max(self.cooldown),
            spam_tolerance: self.spam_tolerance,
            random_increment: self.random_increment,
            prefix: self.prefix,
            buckets: DashMap::new(),
        }
    }
}

impl IncreasingRateLimiter {
    pub fn builder() -> IncreasingRateLimiterBuilder {
        IncreasingRateLimiterBuilder {
            limit: 1,
            cooldown: Duration::from_secs(5),
            max_cooldown: Duration::from_secs(60),
            spam_tolerance: 0,
            random_increment: false,
            prefix: String::new(),
        }
    }

    /// Try to use the limiter for `key` right now
    pub fn try_acquire(&self, key: &str) -> RateLimit {
        self.try_acquire_at(key, Instant::now())
    }

    /// Try to use the limiter for `key` at the given instant
    pub fn try_acquire_at(&self, key: &str, now: Instant) -> RateLimit {
        if self.buckets.len() >= PURGE_THRESHOLD {
            self.purge_expired(now);
        }

        let full_key = format!("{}:{}", self.prefix, key);
        let mut bucket = self.buckets.entry(full_key).or_insert(Bucket {
            used: 0,
            triggers: 0,
            reset_at: now,
        });

        if now >= bucket.reset_at {
            bucket.used = 0;
            bucket.triggers = 0;
        }

        if bucket.used < self.limit {
            if bucket.used == 0 {
                bucket.reset_at = now + self.cooldown;
            }
            bucket.used += 1;
            return RateLimit {
                allowed: true,
                remaining: self.limit - bucket.used,
                wait: bucket.reset_at.saturating_duration_since(now),
                triggers: bucket.triggers,
            };
        }

        bucket.triggers += 1;
        if bucket.triggers > self.spam_tolerance {
            let increment = self.cooldown + self.random_extra();
            let extended = bucket.reset_at + increment;
            let cap = now + self.max_cooldown;
            bucket.reset_at = extended.min(cap).max(bucket.reset_at);
        }

        RateLimit {
            allowed: false,
            remaining: 0,
            wait: bucket.reset_at.saturating_duration_since(now),
            triggers: bucket.triggers,
        }
    }

    /// Drop buckets whose window has already elapsed
    pub fn purge_expired(&self, now: Instant) {
        self.buckets.retain(|_, bucket| bucket.reset_at > now);
    }

    fn random_extra(&self) -> Duration {
        if !self.random_increment {
            return Duration::ZERO;
        }
        let max_ms = (self.cooldown.as_millis() / 4) as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// Format a wait duration the way replies show it
pub fn format_wait(wait: Duration) -> String {
    let secs = wait.as_secs().max(1);
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Check the limiter for `key` and tell the user how long to wait when rejected
pub async fn ratelimit(
    ctx: Context<'_>,
    limiter: &IncreasingRateLimiter,
    key: &str,
) -> Result<bool, Error> {
    let result = limiter.try_acquire(key);
    if result.allowed {
        return Ok(true);
    }

    ctx.say(format_error(&format!(
        "Slow down! You can use this again in **{}**.",
        format_wait(result.wait)
    )))
    .await?;

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, spam_tolerance: u32) -> IncreasingRateLimiter {
        IncreasingRateLimiter::builder()
            .limit(limit)
            .cooldown(Duration::from_secs(5))
            .max_cooldown(Duration::from_secs(20))
            .spam_tolerance(spam_tolerance)
            .prefix("test")
            .build()
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(2, 0);
        let now = Instant::now();

        let first = limiter.try_acquire_at("user", now);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);

        let second = limiter.try_acquire_at("user", now);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.try_acquire_at("user", now);
        assert!(!third.allowed);
    }

    #[test]
    fn test_window_resets_after_cooldown() {
        let limiter = limiter(1, 0);
        let now = Instant::now();

        assert!(limiter.try_acquire_at("user", now).allowed);
        assert!(!limiter.try_acquire_at("user", now + Duration::from_secs(1)).allowed);

        let later = now + Duration::from_secs(60);
        let result = limiter.try_acquire_at("user", later);
        assert!(result.allowed);
        assert_eq!(result.triggers, 0);
    }

    #[test]
    fn test_spam_extends_wait() {
        let limiter = limiter(1, 1);
        let now = Instant::now();

        assert!(limiter.try_acquire_at("user", now).allowed);

        // within tolerance: wait stays at the base cooldown
        let tolerated = limiter.try_acquire_at("user", now);
        assert_eq!(tolerated.triggers, 1);
        assert_eq!(tolerated.wait, Duration::from_secs(5));

        // past tolerance: one more cooldown is added
        let penalized = limiter.try_acquire_at("user", now);
        assert_eq!(penalized.triggers, 2);
        assert_eq!(penalized.wait, Duration::from_secs(10));
    }

    #[test]
    fn test_wait_capped_at_max_cooldown() {
        let limiter = limiter(1, 0);
        let now = Instant::now();
        assert!(limiter.try_acquire_at("user", now).allowed);

        let mut last = limiter.try_acquire_at("user", now);
        for _ in 0..10 {
            last = limiter.try_acquire_at("user", now);
        }
        assert_eq!(last.wait, Duration::from_secs(20));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 0);
        let now = Instant::now();

        assert!(limiter.try_acquire_at("a", now).allowed);
        assert!(limiter.try_acquire_at("b", now).allowed);
        assert!(!limiter.try_acquire_at("a", now).allowed);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = limiter(1, 0);
        let now = Instant::now();
        limiter.try_acquire_at("a", now);
        limiter.purge_expired(now + Duration::from_secs(6));
        assert!(limiter.buckets.is_empty());
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(Duration::from_secs(5)), "5s");
        assert_eq!(format_wait(Duration::from_millis(200)), "1s");
        assert_eq!(format_wait(Duration::from_secs(125)), "2m 5s");
    }
}
