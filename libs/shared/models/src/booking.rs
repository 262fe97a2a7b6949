use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub clinic_id: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    /// `None` means the booking draws from the shared "any specialist" pool.
    #[serde(default)]
    pub specialist_id: Option<String>,
    #[serde(with = "crate::wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "crate::wall_clock")]
    pub end_time: NaiveDateTime,
    pub status: BookingStatus,
    #[serde(default)]
    pub slot_lock_expires_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Whether this booking still consumes capacity at `now`.
    ///
    /// Confirmed and completed bookings always do. A pending booking only
    /// does while its lease is unexpired; a pending row without a lease
    /// never blocks.
    pub fn blocks_capacity(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BookingStatus::Confirmed | BookingStatus::Completed => true,
            BookingStatus::Pending => self
                .slot_lock_expires_at
                .is_some_and(|expires_at| expires_at > now),
            BookingStatus::Cancelled => false,
        }
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending
            && self.slot_lock_expires_at.map_or(true, |expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}
