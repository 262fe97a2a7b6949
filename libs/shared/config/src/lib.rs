use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Which backing store serves bookings and schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub store_backend: StoreBackend,
    pub default_clinic_id: String,
    pub turnstile_secret_key: Option<String>,
    pub turnstile_verify_url: String,
    pub verification_timeout_ms: u64,
    pub google_service_account_json: Option<String>,
    pub google_calendar_id: String,
    pub calendar_timeout_ms: u64,
    pub stripe_webhook_secret: Option<String>,
    pub reservation_lock_minutes: i64,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            store_backend: StoreBackend::Supabase,
            default_clinic_id: "demo".to_string(),
            turnstile_secret_key: None,
            turnstile_verify_url: DEFAULT_TURNSTILE_VERIFY_URL.to_string(),
            verification_timeout_ms: 5000,
            google_service_account_json: None,
            google_calendar_id: "primary".to_string(),
            calendar_timeout_ms: 3000,
            stripe_webhook_secret: None,
            reservation_lock_minutes: 5,
            rate_limit_max_requests: 3,
            rate_limit_window_secs: 60,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            store_backend: parsed_or("BOOKING_STORE", defaults.store_backend),
            default_clinic_id: env::var("DEFAULT_CLINIC_ID")
                .unwrap_or(defaults.default_clinic_id),
            turnstile_secret_key: optional("TURNSTILE_SECRET_KEY"),
            turnstile_verify_url: env::var("TURNSTILE_VERIFY_URL")
                .unwrap_or(defaults.turnstile_verify_url),
            verification_timeout_ms: parsed_or("VERIFICATION_TIMEOUT_MS", defaults.verification_timeout_ms),
            google_service_account_json: optional("GOOGLE_SERVICE_ACCOUNT_JSON"),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .unwrap_or(defaults.google_calendar_id),
            calendar_timeout_ms: parsed_or("CALENDAR_TIMEOUT_MS", defaults.calendar_timeout_ms),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            reservation_lock_minutes: parsed_or("RESERVATION_LOCK_MINUTES", defaults.reservation_lock_minutes),
            rate_limit_max_requests: parsed_or("RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit_max_requests),
            rate_limit_window_secs: parsed_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs),
            port: parsed_or("PORT", defaults.port),
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing Supabase environment variables");
        }
        if config.turnstile_secret_key.is_none() {
            warn!("TURNSTILE_SECRET_KEY not set, human verification is disabled");
        }
        if config.stripe_webhook_secret.is_none() {
            warn!("STRIPE_WEBHOOK_SECRET not set, webhook signatures will not be verified");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_verification_configured(&self) -> bool {
        self.turnstile_secret_key.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_calendar_configured(&self) -> bool {
        self.google_service_account_json.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn calendar_timeout(&self) -> Duration {
        Duration::from_millis(self.calendar_timeout_ms)
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
