use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{BookingStore, ScheduleStore};

use crate::services::calendar::CalendarReader;

/// Collaborators the availability route reads from.
#[derive(Clone)]
pub struct AvailabilityState {
    pub config: Arc<AppConfig>,
    pub bookings: Arc<dyn BookingStore>,
    pub schedule: Arc<dyn ScheduleStore>,
    pub calendar: Arc<dyn CalendarReader>,
}

impl AvailabilityState {
    pub fn new(
        config: Arc<AppConfig>,
        bookings: Arc<dyn BookingStore>,
        schedule: Arc<dyn ScheduleStore>,
        calendar: Arc<dyn CalendarReader>,
    ) -> Self {
        Self {
            config,
            bookings,
            schedule,
            calendar,
        }
    }
}
