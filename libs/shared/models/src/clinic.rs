use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_SERVICE_DURATION_MINUTES: i64 = 60;

/// Per-weekday opening hours. `day_of_week` runs 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHoursOverride {
    pub clinic_id: String,
    pub day_of_week: u8,
    pub is_open: bool,
    pub open_time: String,
    pub close_time: String,
}

impl WorkingHoursOverride {
    pub fn open_hour(&self) -> Option<u32> {
        parse_hour(&self.open_time)
    }

    pub fn close_hour(&self) -> Option<u32> {
        parse_hour(&self.close_time)
    }
}

/// Hour component of an `HH:MM[:SS]` string.
fn parse_hour(raw: &str) -> Option<u32> {
    raw.trim()
        .split(':')
        .next()
        .and_then(|h| h.parse::<u32>().ok())
        .filter(|h| *h <= 24)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialist {
    pub id: String,
    pub clinic_id: String,
    pub name: String,
    /// Service ids this specialist can perform.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub specialties: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Specialist {
    pub fn can_perform(&self, service_id: &str) -> bool {
        self.specialties.iter().any(|s| s == service_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub clinic_id: String,
    /// Localised names keyed by language code.
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Service {
    pub fn duration_minutes(&self) -> i64 {
        match self.duration_minutes {
            Some(minutes) if minutes > 0 => minutes as i64,
            _ => DEFAULT_SERVICE_DURATION_MINUTES,
        }
    }
}

fn default_true() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
