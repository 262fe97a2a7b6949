use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::BookingStore;
use shared_models::{overlaps, Booking};

use crate::models::{PaymentEvent, ReservationError, WebhookOutcome, CHECKOUT_COMPLETED};
use crate::state::ReservationState;

type HmacSha256 = Hmac<Sha256>;

/// Allowed drift between the signature timestamp and now.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| raw.get(i..i + 2).and_then(|byte| u8::from_str_radix(byte, 16).ok()))
        .collect()
}

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>`) against the raw
/// payload. Any `v1` entry may match; comparison is constant time.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now_unix: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    let drift = now_unix.checked_sub(timestamp).map(i64::unsigned_abs);
    if !drift.is_some_and(|drift| drift <= SIGNATURE_TOLERANCE_SECS.unsigned_abs()) {
        debug!("Webhook signature timestamp {} outside tolerance", timestamp);
        return false;
    }

    signatures.iter().filter_map(|s| decode_hex(s)).any(|expected| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    })
}

pub struct PaymentService {
    bookings: Arc<dyn BookingStore>,
    webhook_secret: Option<String>,
}

impl PaymentService {
    pub fn new(state: &ReservationState) -> Self {
        Self {
            bookings: state.bookings.clone(),
            webhook_secret: state.config.stripe_webhook_secret.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Verify and apply a payment provider event. Only completed checkouts
    /// act; they promote the pending booking they reference.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, ReservationError> {
        match &self.webhook_secret {
            Some(secret) => {
                let valid = signature
                    .map(|header| verify_signature(payload, header, secret, Utc::now().timestamp()))
                    .unwrap_or(false);
                if !valid {
                    warn!("Rejected payment webhook with invalid signature");
                    return Err(ReservationError::InvalidSignature);
                }
            }
            None => warn!("STRIPE_WEBHOOK_SECRET not set, accepting payment webhook without verification"),
        }

        let event: PaymentEvent = serde_json::from_slice(payload)
            .map_err(|e| ReservationError::ValidationError(format!("Invalid webhook payload: {}", e)))?;

        info!("Received payment event {}", event.event_type);

        if event.event_type != CHECKOUT_COMPLETED {
            return Ok(WebhookOutcome {
                received: true,
                event_type: event.event_type,
                booking_id: None,
                promoted: false,
            });
        }

        let Some(booking_id) = event.data.object.pending_booking_id() else {
            warn!("Completed checkout carries no pending booking id");
            return Ok(WebhookOutcome {
                received: true,
                event_type: event.event_type,
                booking_id: None,
                promoted: false,
            });
        };

        let promoted = self.promote(booking_id).await?;

        Ok(WebhookOutcome {
            received: true,
            event_type: event.event_type,
            booking_id: Some(booking_id),
            promoted,
        })
    }

    /// Pending to confirmed. Replays and unknown ids promote nothing.
    pub async fn promote(&self, booking_id: Uuid) -> Result<bool, ReservationError> {
        let booking = self.bookings.find_booking(booking_id).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        match booking {
            None => {
                warn!("Payment completed for unknown booking {}", booking_id);
                return Ok(false);
            }
            Some(booking) if booking.lease_expired(Utc::now()) => {
                // The slot may have been re-sold while the lease was lapsed;
                // confirming the paid booking can then exceed capacity.
                let competing = self.competing_bookings(&booking).await;
                warn!("Payment completed after the lease on booking {} expired, confirming anyway \
                       ({} other blocking bookings overlap {} - {})",
                      booking_id, competing, booking.start_time, booking.end_time);
            }
            Some(_) => {}
        }

        let promoted = self.bookings.promote_booking(booking_id).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        if promoted {
            info!("Booking {} confirmed by payment", booking_id);
        } else {
            debug!("Booking {} was not pending, nothing to promote", booking_id);
        }

        Ok(promoted)
    }

    /// Other bookings currently holding capacity over the same interval.
    async fn competing_bookings(&self, booking: &Booking) -> usize {
        let now = Utc::now();
        match self.bookings.bookings_for_date(&booking.clinic_id, booking.start_time.date()).await {
            Ok(day) => day
                .iter()
                .filter(|other| {
                    other.id != booking.id
                        && other.blocks_capacity(now)
                        && overlaps(booking.start_time, booking.end_time, other.start_time, other.end_time)
                })
                .count(),
            Err(e) => {
                warn!("Could not check overlapping bookings for {}: {}", booking.id, e);
                0
            }
        }
    }
}
