use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use shared_database::ScheduleStore;

use crate::models::{AvailabilityError, OpeningHours};

pub const DEFAULT_OPEN_HOUR: u32 = 9;
pub const DEFAULT_CLOSE_HOUR: u32 = 18;

/// 0 = Sunday through 6 = Saturday, taken from the wall-clock date as is.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Schedule used when the clinic has no override row: Mon–Fri 09:00–18:00.
pub fn default_hours(day_of_week: u8) -> OpeningHours {
    OpeningHours {
        is_open: (1..=5).contains(&day_of_week),
        open_hour: DEFAULT_OPEN_HOUR,
        close_hour: DEFAULT_CLOSE_HOUR,
    }
}

pub struct WorkingHoursResolver {
    schedule: Arc<dyn ScheduleStore>,
}

impl WorkingHoursResolver {
    pub fn new(schedule: Arc<dyn ScheduleStore>) -> Self {
        Self { schedule }
    }

    pub async fn resolve(&self, clinic_id: &str, date: NaiveDate) -> Result<OpeningHours, AvailabilityError> {
        let day = day_of_week(date);

        let row = self.schedule.working_hours(clinic_id, day).await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let hours = match row {
            Some(row) => {
                let open_hour = row.open_hour().unwrap_or_else(|| {
                    warn!("Unparseable open_time '{}' for clinic {} day {}", row.open_time, clinic_id, day);
                    DEFAULT_OPEN_HOUR
                });
                let close_hour = row.close_hour().unwrap_or_else(|| {
                    warn!("Unparseable close_time '{}' for clinic {} day {}", row.close_time, clinic_id, day);
                    DEFAULT_CLOSE_HOUR
                });
                debug!("Using configured hours for clinic {} day {}: open={}, {}:00-{}:00",
                       clinic_id, day, row.is_open, open_hour, close_hour);
                OpeningHours {
                    is_open: row.is_open,
                    open_hour,
                    close_hour,
                }
            }
            None => {
                let hours = default_hours(day);
                debug!("Using default hours for clinic {} day {}: open={}", clinic_id, day, hours.is_open);
                hours
            }
        };

        Ok(hours)
    }
}
