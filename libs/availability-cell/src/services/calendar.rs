use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::wall_clock;

use crate::models::BusyInterval;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google issues one-hour tokens; longer claims are not trusted.
const MAX_TOKEN_LIFETIME_SECS: u64 = 3600;

/// How long a freshly issued token is reused. Refreshes a minute early.
fn token_reuse_window(expires_in: Option<u64>) -> Duration {
    let lifetime = expires_in
        .unwrap_or(MAX_TOKEN_LIFETIME_SECS)
        .min(MAX_TOKEN_LIFETIME_SECS);
    Duration::from_secs(lifetime.saturating_sub(60))
}

/// Read-only source of clinic-wide blocked time. Every interval it returns
/// blocks all specialists.
#[async_trait]
pub trait CalendarReader: Send + Sync {
    async fn busy_intervals(&self, clinic_id: &str, date: NaiveDate) -> Result<Vec<BusyInterval>>;
}

/// Used when no calendar is connected.
pub struct NoCalendar;

#[async_trait]
impl CalendarReader for NoCalendar {
    async fn busy_intervals(&self, _clinic_id: &str, _date: NaiveDate) -> Result<Vec<BusyInterval>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvent {
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl EventTime {
    /// Timed events carry `dateTime`; all-day events only a `date`.
    fn wall_clock(&self) -> Option<chrono::NaiveDateTime> {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .and_then(wall_clock::parse)
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Google Calendar over a service account: an RS256-signed assertion is
/// exchanged for an access token, then the day's events are listed.
pub struct GoogleCalendarReader {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token_url: String,
    api_base: String,
    calendar_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarReader {
    pub fn new(service_account_json: &str, calendar_id: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(service_account_json)
            .context("GOOGLE_SERVICE_ACCOUNT_JSON is not a valid service account key")?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("service account private key is not a valid RSA PEM")?;
        let token_url = key.token_uri.clone().unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());

        Ok(Self {
            client: Client::new(),
            key,
            encoding_key,
            token_url,
            api_base: GOOGLE_CALENDAR_API.to_string(),
            calendar_id: calendar_id.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let json = config.google_service_account_json.as_deref()
            .ok_or_else(|| anyhow!("GOOGLE_SERVICE_ACCOUNT_JSON not set"))?;
        Self::new(json, &config.google_calendar_id)
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn signed_assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: &self.key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.token_url,
            exp: now + 3600,
            iat: now,
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion()?;
        let response = self.client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Calendar token exchange failed ({}): {}", status, body);
            return Err(anyhow!("Calendar token exchange failed with status {}", status));
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + token_reuse_window(token.expires_in),
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarReader for GoogleCalendarReader {
    async fn busy_intervals(&self, clinic_id: &str, date: NaiveDate) -> Result<Vec<BusyInterval>> {
        let access_token = self.access_token().await?;

        let day = date.format("%Y-%m-%d");
        let time_min = format!("{}T00:00:00Z", day);
        let time_max = format!("{}T23:59:59Z", day);
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&self.calendar_id)
        );

        let response = self.client
            .get(&url)
            .bearer_auth(&access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Calendar events fetch failed ({}): {}", status, body);
            return Err(anyhow!("Calendar events fetch failed with status {}", status));
        }

        let events: EventsResponse = response.json().await?;
        let intervals: Vec<BusyInterval> = events.items
            .iter()
            .filter_map(|event| {
                let start = event.start.as_ref()?.wall_clock()?;
                let end = event.end.as_ref()?.wall_clock()?;
                Some(BusyInterval::global(start, end))
            })
            .collect();

        debug!("Calendar returned {} of {} events as busy for clinic {} on {}",
               intervals.len(), events.items.len(), clinic_id, day);

        Ok(intervals)
    }
}
