use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use shared_models::{
    overlaps, Booking, BookingStatus, CapacityUsage, Service, Specialist, WorkingHoursOverride,
};

use crate::store::{BookingStore, ReserveOutcome, ScheduleStore, SlotReservation, SLOT_ALREADY_BOOKED};

/// Process-local store for single-instance deployments and tests.
///
/// All reservation writes go through one mutex, so the capacity check and
/// the insert happen as a single step exactly like the database function.
#[derive(Default)]
pub struct InMemoryStore {
    bookings: Mutex<Vec<Booking>>,
    working_hours: RwLock<HashMap<(String, u8), WorkingHoursOverride>>,
    specialists: RwLock<Vec<Specialist>>,
    services: RwLock<Vec<Service>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_working_hours(&self, hours: WorkingHoursOverride) {
        let key = (hours.clinic_id.clone(), hours.day_of_week);
        self.working_hours.write().await.insert(key, hours);
    }

    pub async fn add_specialist(&self, specialist: Specialist) {
        let mut specialists = self.specialists.write().await;
        specialists.retain(|s| !(s.id == specialist.id && s.clinic_id == specialist.clinic_id));
        specialists.push(specialist);
    }

    pub async fn add_service(&self, service: Service) {
        let mut services = self.services.write().await;
        services.retain(|s| !(s.id == service.id && s.clinic_id == service.clinic_id));
        services.push(service);
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.bookings.lock().await.push(booking);
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().await.clone()
    }

    pub async fn reserve_slot_at(&self, reservation: &SlotReservation, now: DateTime<Utc>) -> ReserveOutcome {
        let mut bookings = self.bookings.lock().await;

        if let Some(reason) = conflict_reason(&bookings, reservation, now) {
            debug!("In-memory reserve rejected for clinic {}: {}", reservation.clinic_id, reason);
            return ReserveOutcome::Conflict { reason };
        }

        let booking_id = Uuid::new_v4();
        let lock_expires_at = now + Duration::minutes(reservation.lock_minutes);

        bookings.push(Booking {
            id: booking_id,
            clinic_id: reservation.clinic_id.clone(),
            customer_email: reservation.customer_email.clone(),
            customer_name: reservation.customer_name.clone(),
            service_id: reservation.service_id.clone(),
            service_name: reservation.service_name.clone(),
            specialist_id: reservation.specialist_id.clone(),
            start_time: reservation.start_time,
            end_time: reservation.end_time,
            status: BookingStatus::Pending,
            slot_lock_expires_at: Some(lock_expires_at),
        });

        ReserveOutcome::Reserved { booking_id, lock_expires_at }
    }
}

/// Capacity rule shared with the `reserve_slot` SQL function.
fn conflict_reason(bookings: &[Booking], reservation: &SlotReservation, now: DateTime<Utc>) -> Option<String> {
    let mut usage = CapacityUsage::new();

    let overlapping = bookings.iter().filter(|b| {
        b.clinic_id == reservation.clinic_id
            && b.blocks_capacity(now)
            && overlaps(reservation.start_time, reservation.end_time, b.start_time, b.end_time)
    });

    for booking in overlapping {
        match booking.specialist_id.as_deref() {
            Some(id) if reservation.qualified_specialist_ids.iter().any(|q| q == id) => usage.record(Some(id)),
            Some(_) => {}
            None => usage.record(None),
        }
    }

    if let Some(pinned) = reservation.specialist_id.as_deref() {
        if usage.is_named_busy(pinned) {
            return Some(SLOT_ALREADY_BOOKED.to_string());
        }
    }

    let capacity = reservation.qualified_specialist_ids.len() as u32;
    if usage.free(capacity) == 0 {
        return Some(SLOT_ALREADY_BOOKED.to_string());
    }

    None
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn bookings_for_date(&self, clinic_id: &str, date: NaiveDate) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self.bookings.lock().await
            .iter()
            .filter(|b| b.clinic_id == clinic_id && b.start_time.date() == date)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_time);
        Ok(bookings)
    }

    async fn reserve_slot(&self, reservation: &SlotReservation) -> Result<ReserveOutcome> {
        Ok(self.reserve_slot_at(reservation, Utc::now()).await)
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.lock().await.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn promote_booking(&self, booking_id: Uuid) -> Result<bool> {
        let mut bookings = self.bookings.lock().await;
        match bookings.iter_mut().find(|b| b.id == booking_id && b.status == BookingStatus::Pending) {
            Some(booking) => {
                booking.status = BookingStatus::Confirmed;
                booking.slot_lock_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn working_hours(&self, clinic_id: &str, day_of_week: u8) -> Result<Option<WorkingHoursOverride>> {
        let key = (clinic_id.to_string(), day_of_week);
        Ok(self.working_hours.read().await.get(&key).cloned())
    }

    async fn active_specialists(&self, clinic_id: &str) -> Result<Vec<Specialist>> {
        Ok(self.specialists.read().await
            .iter()
            .filter(|s| s.clinic_id == clinic_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn service(&self, clinic_id: &str, service_id: &str) -> Result<Option<Service>> {
        Ok(self.services.read().await
            .iter()
            .find(|s| s.clinic_id == clinic_id && s.id == service_id)
            .cloned())
    }
}
