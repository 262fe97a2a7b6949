use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_database::InMemoryStore;
use shared_models::{Booking, BookingStatus, Service, Specialist, WorkingHoursOverride};

pub const TEST_CLINIC: &str = "test-clinic";

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub default_clinic_id: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            default_clinic_id: TEST_CLINIC.to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointed at a mock PostgREST server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            store_backend: StoreBackend::Memory,
            default_clinic_id: self.default_clinic_id.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Wall-clock instant on `date`.
pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour as i64) + Duration::minutes(minute as i64)
}

pub struct TestClinic {
    pub id: String,
}

impl Default for TestClinic {
    fn default() -> Self {
        Self::new(TEST_CLINIC)
    }
}

impl TestClinic {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    pub fn specialist(&self, id: &str, specialties: &[&str]) -> Specialist {
        Specialist {
            id: id.to_string(),
            clinic_id: self.id.clone(),
            name: format!("Specialist {}", id),
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
            is_active: true,
        }
    }

    pub fn service(&self, id: &str, duration_minutes: Option<i32>) -> Service {
        Service {
            id: id.to_string(),
            clinic_id: self.id.clone(),
            name: json!({ "en": format!("Service {}", id) }),
            description: Value::Null,
            price: Some(50.0),
            duration_minutes,
            category: None,
        }
    }

    pub fn hours(&self, day_of_week: u8, is_open: bool, open_time: &str, close_time: &str) -> WorkingHoursOverride {
        WorkingHoursOverride {
            clinic_id: self.id.clone(),
            day_of_week,
            is_open,
            open_time: open_time.to_string(),
            close_time: close_time.to_string(),
        }
    }

    pub fn confirmed_booking(&self, specialist_id: Option<&str>, start: NaiveDateTime, end: NaiveDateTime) -> Booking {
        self.booking(BookingStatus::Confirmed, specialist_id, start, end, None)
    }

    pub fn pending_booking(
        &self,
        specialist_id: Option<&str>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        lock_expires_at: DateTime<Utc>,
    ) -> Booking {
        self.booking(BookingStatus::Pending, specialist_id, start, end, Some(lock_expires_at))
    }

    pub fn booking(
        &self,
        status: BookingStatus,
        specialist_id: Option<&str>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        lock_expires_at: Option<DateTime<Utc>>,
    ) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            clinic_id: self.id.clone(),
            customer_email: "existing@example.com".to_string(),
            customer_name: Some("Existing Customer".to_string()),
            service_id: None,
            service_name: None,
            specialist_id: specialist_id.map(str::to_string),
            start_time: start,
            end_time: end,
            status,
            slot_lock_expires_at: lock_expires_at,
        }
    }

    /// In-process store holding `specialists` who all perform `service_id`,
    /// plus the service itself with the default duration.
    pub async fn seeded_store(&self, service_id: &str, specialists: &[&str]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_service(self.service(service_id, None)).await;
        for id in specialists {
            store.add_specialist(self.specialist(id, &[service_id])).await;
        }
        store
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn booking_row(clinic_id: &str, specialist_id: Option<&str>, start: &str, end: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "customer_email": "existing@example.com",
            "customer_name": "Existing Customer",
            "service_id": null,
            "service_name": null,
            "specialist_id": specialist_id,
            "start_time": start,
            "end_time": end,
            "status": status,
            "slot_lock_expires_at": null
        })
    }

    pub fn specialist_row(clinic_id: &str, id: &str, specialties: &[&str]) -> Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "name": format!("Specialist {}", id),
            "specialties": specialties,
            "is_active": true
        })
    }

    pub fn reserve_success(booking_id: Uuid) -> Value {
        json!([{
            "success": true,
            "booking_id": booking_id,
            "lock_expires_at": (Utc::now() + Duration::minutes(5)).to_rfc3339(),
            "error_message": null
        }])
    }

    pub fn reserve_conflict() -> Value {
        json!([{
            "success": false,
            "booking_id": null,
            "lock_expires_at": null,
            "error_message": "SLOT_ALREADY_BOOKED"
        }])
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert_eq!(app_config.default_clinic_id, TEST_CLINIC);
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_at_builds_wall_clock_time() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(at(date, 14, 30).format("%Y-%m-%dT%H:%M").to_string(), "2025-06-10T14:30");
    }

    #[test]
    fn test_clinic_builders_share_clinic_id() {
        let clinic = TestClinic::new("north");
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

        let specialist = clinic.specialist("anna", &["cleaning"]);
        assert_eq!(specialist.clinic_id, "north");
        assert!(specialist.can_perform("cleaning"));

        let booking = clinic.confirmed_booking(Some("anna"), at(date, 10, 0), at(date, 11, 0));
        assert_eq!(booking.clinic_id, "north");
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.slot_lock_expires_at.is_none());
    }

    #[test]
    fn test_booking_row_decodes() {
        let row = MockSupabaseResponses::booking_row(
            TEST_CLINIC,
            Some("anna"),
            "2025-06-10T10:00:00",
            "2025-06-10T11:00:00",
            "confirmed",
        );
        let booking: Booking = serde_json::from_value(row).unwrap();
        assert_eq!(booking.specialist_id.as_deref(), Some("anna"));
    }
}
