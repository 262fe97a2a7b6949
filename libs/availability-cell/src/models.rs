use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

/// Query string of `GET /availability`. Everything is optional at the
/// extractor level so a missing date surfaces as our own validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
    pub clinic_id: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// `HH:MM` in clinic-local time.
    pub time: String,
    pub available: bool,
    pub available_specialists: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub slots: Vec<TimeSlot>,
}

// ==============================================================================
// SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub is_open: bool,
    pub open_hour: u32,
    pub close_hour: u32,
}

impl OpeningHours {
    pub fn closed() -> Self {
        Self {
            is_open: false,
            open_hour: 0,
            close_hour: 0,
        }
    }
}

/// Specialists able to perform the requested service. Their count is the
/// capacity of every slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifiedSpecialists {
    ids: Vec<String>,
}

impl QualifiedSpecialists {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, specialist_id: &str) -> bool {
        self.ids.iter().any(|id| id == specialist_id)
    }

    pub fn count(&self) -> u32 {
        self.ids.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusyScope {
    /// Blocks one named specialist.
    Specialist(String),
    /// Consumes one unit of the shared "any specialist" pool.
    Unassigned,
    /// Blocks every specialist, e.g. a clinic-wide calendar event.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub scope: BusyScope,
}

impl BusyInterval {
    pub fn global(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            scope: BusyScope::Global,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidDate => AppError::ValidationError(err.to_string()),
            AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
