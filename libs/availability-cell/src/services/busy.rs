use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use shared_database::BookingStore;
use shared_models::Booking;

use crate::models::{AvailabilityError, BusyInterval, BusyScope, QualifiedSpecialists};
use crate::services::calendar::CalendarReader;

/// Turn the day's bookings into busy intervals for the given specialist set.
///
/// Non-blocking bookings (cancelled, or pending with a lapsed lease) are
/// dropped, as are bookings held by specialists outside the set.
pub fn booking_intervals(
    bookings: &[Booking],
    qualified: &QualifiedSpecialists,
    now: DateTime<Utc>,
) -> Vec<BusyInterval> {
    bookings
        .iter()
        .filter(|b| b.blocks_capacity(now))
        .filter_map(|b| {
            let scope = match b.specialist_id.as_deref() {
                Some(id) if qualified.contains(id) => BusyScope::Specialist(id.to_string()),
                Some(_) => return None,
                None => BusyScope::Unassigned,
            };
            Some(BusyInterval {
                start: b.start_time,
                end: b.end_time,
                scope,
            })
        })
        .collect()
}

pub struct BusyIntervalAggregator {
    bookings: Arc<dyn BookingStore>,
    calendar: Arc<dyn CalendarReader>,
    calendar_timeout: Duration,
}

impl BusyIntervalAggregator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarReader>,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            bookings,
            calendar,
            calendar_timeout,
        }
    }

    /// Booking intervals plus calendar intervals for one clinic day.
    ///
    /// The booking read and the calendar read run concurrently. A booking
    /// store failure fails the whole computation; the calendar degrades to
    /// nothing on error or timeout.
    pub async fn collect(
        &self,
        clinic_id: &str,
        date: NaiveDate,
        qualified: &QualifiedSpecialists,
        now: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, AvailabilityError> {
        let (bookings, calendar) = tokio::join!(
            self.bookings.bookings_for_date(clinic_id, date),
            self.calendar_intervals(clinic_id, date),
        );

        let bookings = bookings.map_err(|e| {
            error!("Failed to load bookings for clinic {} on {}: {}", clinic_id, date, e);
            AvailabilityError::DatabaseError(e.to_string())
        })?;

        let mut busy = booking_intervals(&bookings, qualified, now);
        debug!("Clinic {} on {}: {} bookings, {} blocking qualified specialists, {} calendar blocks",
               clinic_id, date, bookings.len(), busy.len(), calendar.len());

        busy.extend(calendar);
        Ok(busy)
    }

    async fn calendar_intervals(&self, clinic_id: &str, date: NaiveDate) -> Vec<BusyInterval> {
        match timeout(self.calendar_timeout, self.calendar.busy_intervals(clinic_id, date)).await {
            Ok(Ok(intervals)) => intervals
                .into_iter()
                .map(|i| BusyInterval::global(i.start, i.end))
                .collect(),
            Ok(Err(e)) => {
                warn!("Calendar unavailable for clinic {} on {}, ignoring it: {}", clinic_id, date, e);
                Vec::new()
            }
            Err(_) => {
                warn!("Calendar read timed out after {:?} for clinic {} on {}, ignoring it",
                      self.calendar_timeout, clinic_id, date);
                Vec::new()
            }
        }
    }
}
