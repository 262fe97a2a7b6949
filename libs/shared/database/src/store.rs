use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::{Booking, Service, Specialist, WorkingHoursOverride};

/// Everything the atomic reserve operation needs to decide and insert in
/// one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotReservation {
    pub clinic_id: String,
    #[serde(with = "shared_models::wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "shared_models::wall_clock")]
    pub end_time: NaiveDateTime,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    /// Pin the booking to one specialist, or leave it on the shared pool.
    pub specialist_id: Option<String>,
    /// Specialists who can perform the service; their count is the capacity.
    pub qualified_specialist_ids: Vec<String>,
    pub lock_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved {
        booking_id: Uuid,
        lock_expires_at: DateTime<Utc>,
    },
    Conflict {
        reason: String,
    },
}

pub const SLOT_ALREADY_BOOKED: &str = "SLOT_ALREADY_BOOKED";

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Every booking of the clinic that starts on `date`, whatever its status.
    async fn bookings_for_date(&self, clinic_id: &str, date: NaiveDate) -> Result<Vec<Booking>>;

    /// Check capacity and insert a pending, leased booking as one atomic
    /// step. A conflict is an `Ok` outcome, not an error.
    async fn reserve_slot(&self, reservation: &SlotReservation) -> Result<ReserveOutcome>;

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>>;

    /// Move a pending booking to confirmed and drop its lease. Returns
    /// `false` when the booking is missing or no longer pending.
    async fn promote_booking(&self, booking_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn working_hours(&self, clinic_id: &str, day_of_week: u8) -> Result<Option<WorkingHoursOverride>>;

    async fn active_specialists(&self, clinic_id: &str) -> Result<Vec<Specialist>>;

    async fn service(&self, clinic_id: &str, service_id: &str) -> Result<Option<Service>>;
}
