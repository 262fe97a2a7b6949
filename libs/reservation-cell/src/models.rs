use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::{error::AppError, Booking, BookingStatus};

// ==============================================================================
// RESERVATION MODELS
// ==============================================================================

/// Body of `POST /reserve-slot`. Every field is optional at parse time so
/// presence is checked by the validation gate with its own message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReserveSlotRequest {
    pub clinic_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub specialist_id: Option<String>,
    pub cf_turnstile_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveSlotResponse {
    pub success: bool,
    pub pending_booking_id: Uuid,
    pub lock_expires_at: DateTime<Utc>,
}

// ==============================================================================
// BOOKING LOOKUP MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingLookupQuery {
    pub clinic_id: Option<String>,
}

/// What the checkout step may see of a booking. Contact email is left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    pub id: Uuid,
    pub clinic_id: String,
    #[serde(with = "shared_models::wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "shared_models::wall_clock")]
    pub end_time: NaiveDateTime,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub specialist_id: Option<String>,
    pub customer_name: Option<String>,
    pub status: BookingStatus,
    pub lock_expires_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            clinic_id: booking.clinic_id,
            start_time: booking.start_time,
            end_time: booking.end_time,
            service_id: booking.service_id,
            service_name: booking.service_name,
            specialist_id: booking.specialist_id,
            customer_name: booking.customer_name,
            status: booking.status,
            lock_expires_at: booking.slot_lock_expires_at,
        }
    }
}

// ==============================================================================
// PAYMENT WEBHOOK MODELS
// ==============================================================================

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentEventData {
    #[serde(default)]
    pub object: CheckoutSession,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub pending_booking_id: Option<String>,
}

impl CheckoutSession {
    /// The pending booking this checkout paid for.
    pub fn pending_booking_id(&self) -> Option<Uuid> {
        self.client_reference_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .or_else(|| {
                self.metadata
                    .as_ref()
                    .and_then(|m| m.pending_booking_id.as_deref())
                    .and_then(|id| Uuid::parse_str(id.trim()).ok())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub received: bool,
    pub event_type: String,
    pub booking_id: Option<Uuid>,
    pub promoted: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReservationError {
    #[error("Too many reservation attempts, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("{0}")]
    ValidationError(String),

    #[error("Human verification failed")]
    VerificationFailed,

    #[error("This time slot was just booked by someone else")]
    SlotAlreadyBooked,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::RateLimited { retry_after_secs } => AppError::RateLimited { retry_after_secs },
            ReservationError::ValidationError(msg) => AppError::ValidationError(msg),
            ReservationError::VerificationFailed => AppError::VerificationFailed(err.to_string()),
            ReservationError::SlotAlreadyBooked => AppError::Conflict(err.to_string()),
            ReservationError::BookingNotFound => AppError::NotFound(err.to_string()),
            ReservationError::InvalidSignature => AppError::Auth(err.to_string()),
            ReservationError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
