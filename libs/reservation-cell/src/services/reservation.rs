use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::NaiveDateTime;
use regex::Regex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use availability_cell::SpecialistResolver;
use shared_database::{BookingStore, ReserveOutcome, ScheduleStore, SlotReservation};
use shared_models::wall_clock;

use crate::models::{BookingView, ReservationError, ReserveSlotRequest, ReserveSlotResponse};
use crate::services::rate_limit::{RateLimitDecision, SlidingWindowRateLimiter};
use crate::services::verification::HumanVerifier;
use crate::state::ReservationState;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_time(field: &str, raw: &str) -> Result<NaiveDateTime, ReservationError> {
    wall_clock::parse(raw).ok_or_else(|| ReservationError::ValidationError(format!("Invalid {} format", field)))
}

/// Required fields after presence and format checks.
struct ValidatedRequest<'a> {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    customer_email: &'a str,
}

pub struct ReservationService {
    default_clinic_id: String,
    lock_minutes: i64,
    verification_timeout: Duration,
    bookings: Arc<dyn BookingStore>,
    schedule: Arc<dyn ScheduleStore>,
    specialists: SpecialistResolver,
    verifier: Option<Arc<dyn HumanVerifier>>,
    rate_limiter: Arc<SlidingWindowRateLimiter>,
}

impl ReservationService {
    pub fn new(state: &ReservationState) -> Self {
        Self {
            default_clinic_id: state.config.default_clinic_id.clone(),
            lock_minutes: state.config.reservation_lock_minutes,
            verification_timeout: state.config.verification_timeout(),
            bookings: state.bookings.clone(),
            schedule: state.schedule.clone(),
            specialists: SpecialistResolver::new(state.schedule.clone()),
            verifier: state.verifier.clone(),
            rate_limiter: state.rate_limiter.clone(),
        }
    }

    /// Run the reservation gates in order and, if all pass, attempt the
    /// atomic reserve. The body is taken raw so that the rate limit is
    /// charged before any parsing work.
    pub async fn reserve_slot(&self, raw_body: &[u8], client_ip: &str) -> Result<ReserveSlotResponse, ReservationError> {
        if let RateLimitDecision::Limited { retry_after_secs } = self.rate_limiter.check_rate_limit(client_ip).await {
            info!("Rate limit exceeded for client {}", client_ip);
            return Err(ReservationError::RateLimited { retry_after_secs });
        }

        let request: ReserveSlotRequest = serde_json::from_slice(raw_body)
            .map_err(|e| ReservationError::ValidationError(format!("Invalid request body: {}", e)))?;

        let validated = Self::validate(&request)?;

        self.verify_human(request.cf_turnstile_token.as_deref(), client_ip).await?;

        let clinic_id = present(&request.clinic_id).unwrap_or(self.default_clinic_id.as_str()).to_string();
        let ValidatedRequest { start_time, end_time, customer_email } = validated;

        let service_id = present(&request.service_id);
        self.check_service_duration(&clinic_id, service_id, start_time, end_time).await?;

        let qualified = self.specialists.qualified(&clinic_id, service_id).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        let specialist_id = present(&request.specialist_id);
        if let Some(pinned) = specialist_id {
            if !qualified.contains(pinned) {
                return Err(ReservationError::ValidationError(
                    "Selected specialist cannot perform this service".to_string(),
                ));
            }
        }

        let reservation = SlotReservation {
            clinic_id,
            start_time,
            end_time,
            customer_email: customer_email.to_string(),
            customer_name: present(&request.customer_name).map(str::to_string),
            service_id: service_id.map(str::to_string),
            service_name: present(&request.service_name).map(str::to_string),
            specialist_id: specialist_id.map(str::to_string),
            qualified_specialist_ids: qualified.ids().to_vec(),
            lock_minutes: self.lock_minutes,
        };

        debug!("Reserving {} - {} at clinic {} against {} qualified specialists",
               reservation.start_time, reservation.end_time, reservation.clinic_id,
               reservation.qualified_specialist_ids.len());

        let outcome = self.bookings.reserve_slot(&reservation).await.map_err(|e| {
            error!("Atomic reserve failed for clinic {}: {}", reservation.clinic_id, e);
            ReservationError::DatabaseError(e.to_string())
        })?;

        match outcome {
            ReserveOutcome::Reserved { booking_id, lock_expires_at } => {
                info!("Slot reserved at clinic {}: pending booking {}", reservation.clinic_id, booking_id);
                Ok(ReserveSlotResponse {
                    success: true,
                    pending_booking_id: booking_id,
                    lock_expires_at,
                })
            }
            ReserveOutcome::Conflict { reason } => {
                info!("Slot conflict at clinic {} for {}: {}", reservation.clinic_id, reservation.start_time, reason);
                Err(ReservationError::SlotAlreadyBooked)
            }
        }
    }

    pub async fn get_booking(&self, booking_id: Uuid, clinic_id: Option<&str>) -> Result<BookingView, ReservationError> {
        let booking = self.bookings.find_booking(booking_id).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?
            .ok_or(ReservationError::BookingNotFound)?;

        if clinic_id.is_some_and(|clinic| clinic != booking.clinic_id) {
            return Err(ReservationError::BookingNotFound);
        }

        Ok(BookingView::from(booking))
    }

    fn validate(request: &ReserveSlotRequest) -> Result<ValidatedRequest<'_>, ReservationError> {
        let (start_time, end_time, customer_email) = match (
            present(&request.start_time),
            present(&request.end_time),
            present(&request.customer_email),
        ) {
            (Some(start), Some(end), Some(email)) => (start, end, email),
            _ => {
                return Err(ReservationError::ValidationError(
                    "Missing required fields: start_time, end_time, customer_email".to_string(),
                ))
            }
        };

        if !is_valid_email(customer_email) {
            return Err(ReservationError::ValidationError("Invalid email format".to_string()));
        }

        let start_time = parse_time("start_time", start_time)?;
        let end_time = parse_time("end_time", end_time)?;
        if start_time >= end_time {
            return Err(ReservationError::ValidationError("start_time must be before end_time".to_string()));
        }

        Ok(ValidatedRequest {
            start_time,
            end_time,
            customer_email,
        })
    }

    async fn verify_human(&self, token: Option<&str>, client_ip: &str) -> Result<(), ReservationError> {
        let verifier = match &self.verifier {
            Some(verifier) => verifier,
            None => return Ok(()),
        };

        let passed = match timeout(self.verification_timeout, verifier.verify(token, client_ip)).await {
            Ok(Ok(passed)) => passed,
            Ok(Err(e)) => {
                warn!("Human verification errored for {}: {}", client_ip, e);
                false
            }
            Err(_) => {
                warn!("Human verification timed out after {:?} for {}", self.verification_timeout, client_ip);
                false
            }
        };

        if passed {
            Ok(())
        } else {
            info!("Human verification failed for {}", client_ip);
            Err(ReservationError::VerificationFailed)
        }
    }

    /// The booked interval must match the service's duration when the
    /// service is known to the clinic.
    async fn check_service_duration(
        &self,
        clinic_id: &str,
        service_id: Option<&str>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Result<(), ReservationError> {
        let Some(service_id) = service_id else {
            return Ok(());
        };

        let service = self.schedule.service(clinic_id, service_id).await
            .map_err(|e| ReservationError::DatabaseError(e.to_string()))?;

        match service {
            Some(service) => {
                let expected = service.duration_minutes();
                let requested = (end_time - start_time).num_minutes();
                if requested != expected {
                    return Err(ReservationError::ValidationError(format!(
                        "Booking length of {} minutes does not match the {} minute service",
                        requested, expected
                    )));
                }
                Ok(())
            }
            None => {
                debug!("Service {} unknown at clinic {}, skipping duration check", service_id, clinic_id);
                Ok(())
            }
        }
    }
}
