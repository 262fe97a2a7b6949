use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{BookingStore, ScheduleStore};

use crate::services::rate_limit::{RateLimitConfig, SlidingWindowRateLimiter};
use crate::services::verification::HumanVerifier;

#[derive(Clone)]
pub struct ReservationState {
    pub config: Arc<AppConfig>,
    pub bookings: Arc<dyn BookingStore>,
    pub schedule: Arc<dyn ScheduleStore>,
    /// `None` skips the human-verification gate.
    pub verifier: Option<Arc<dyn HumanVerifier>>,
    pub rate_limiter: Arc<SlidingWindowRateLimiter>,
}

impl ReservationState {
    pub fn new(
        config: Arc<AppConfig>,
        bookings: Arc<dyn BookingStore>,
        schedule: Arc<dyn ScheduleStore>,
        verifier: Option<Arc<dyn HumanVerifier>>,
    ) -> Self {
        let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(RateLimitConfig::from(config.as_ref())));
        Self {
            config,
            bookings,
            schedule,
            verifier,
            rate_limiter,
        }
    }
}
