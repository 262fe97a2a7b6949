use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use shared_config::AppConfig;

/// Entries kept before idle keys are swept.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: usize,
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 3,
            window_duration: Duration::from_secs(60),
        }
    }
}

impl From<&AppConfig> for RateLimitConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            requests_per_window: config.rate_limit_max_requests,
            window_duration: Duration::from_secs(config.rate_limit_window_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: usize },
    Limited { retry_after_secs: u64 },
}

/// Per-client sliding-window limiter for reservation attempts.
///
/// State lives in this process only and is lost on restart; it dampens
/// abuse but is not a quota.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    windows: RwLock<HashMap<String, Vec<Instant>>>,
    config: RateLimitConfig,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub async fn check_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        self.check_rate_limit_at(identifier, Instant::now()).await
    }

    pub async fn check_rate_limit_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let window = self.config.window_duration;
        let mut windows = self.windows.write().await;

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, requests| requests.iter().any(|&t| now.saturating_duration_since(t) < window));
        }

        let requests = windows.entry(identifier.to_string()).or_default();
        requests.retain(|&t| now.saturating_duration_since(t) < window);

        if requests.len() >= self.config.requests_per_window {
            // The oldest attempt leaving the window frees the next one.
            let retry_after = requests
                .first()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);

            debug!("Rate limit hit for {} ({} attempts in window)", identifier, requests.len());
            return RateLimitDecision::Limited {
                retry_after_secs: retry_after_secs.max(1),
            };
        }

        requests.push(now);
        RateLimitDecision::Allowed {
            remaining: self.config.requests_per_window - requests.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> SlidingWindowRateLimiter {
        SlidingWindowRateLimiter::new(RateLimitConfig::default())
    }

    #[tokio::test]
    async fn allows_three_then_limits() {
        let limiter = limiter();
        let start = Instant::now();

        assert_eq!(limiter.check_rate_limit_at("1.2.3.4", start).await, RateLimitDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_rate_limit_at("1.2.3.4", start).await, RateLimitDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_rate_limit_at("1.2.3.4", start).await, RateLimitDecision::Allowed { remaining: 0 });
        assert_eq!(
            limiter.check_rate_limit_at("1.2.3.4", start + Duration::from_secs(20)).await,
            RateLimitDecision::Limited { retry_after_secs: 40 }
        );
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = limiter();
        let start = Instant::now();

        limiter.check_rate_limit_at("ip", start).await;
        limiter.check_rate_limit_at("ip", start + Duration::from_secs(30)).await;
        limiter.check_rate_limit_at("ip", start + Duration::from_secs(40)).await;

        // The first attempt has left the window, the other two have not.
        assert_eq!(
            limiter.check_rate_limit_at("ip", start + Duration::from_secs(61)).await,
            RateLimitDecision::Allowed { remaining: 0 }
        );
        assert!(matches!(
            limiter.check_rate_limit_at("ip", start + Duration::from_secs(62)).await,
            RateLimitDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..3 {
            limiter.check_rate_limit_at("a", now).await;
        }

        assert!(matches!(limiter.check_rate_limit_at("a", now).await, RateLimitDecision::Limited { .. }));
        assert!(matches!(limiter.check_rate_limit_at("b", now).await, RateLimitDecision::Allowed { .. }));
    }
}
