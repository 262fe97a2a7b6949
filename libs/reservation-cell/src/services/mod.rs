pub mod payment;
pub mod rate_limit;
pub mod reservation;
pub mod verification;

pub use payment::PaymentService;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, SlidingWindowRateLimiter};
pub use reservation::ReservationService;
pub use verification::{HumanVerifier, TurnstileVerifier};
