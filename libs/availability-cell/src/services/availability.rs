use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::models::{AvailabilityError, AvailabilityQuery, TimeSlot};
use crate::services::busy::BusyIntervalAggregator;
use crate::services::slots::compute_slots;
use crate::services::specialists::SpecialistResolver;
use crate::services::working_hours::WorkingHoursResolver;
use crate::state::AvailabilityState;

/// Strict `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AvailabilityError> {
    let raw = raw.trim();
    let well_formed = raw.len() == 10
        && raw.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !well_formed {
        return Err(AvailabilityError::InvalidDate);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AvailabilityError::InvalidDate)
}

pub struct AvailabilityService {
    default_clinic_id: String,
    working_hours: WorkingHoursResolver,
    specialists: SpecialistResolver,
    busy: BusyIntervalAggregator,
}

impl AvailabilityService {
    pub fn new(state: &AvailabilityState) -> Self {
        Self {
            default_clinic_id: state.config.default_clinic_id.clone(),
            working_hours: WorkingHoursResolver::new(state.schedule.clone()),
            specialists: SpecialistResolver::new(state.schedule.clone()),
            busy: BusyIntervalAggregator::new(
                state.bookings.clone(),
                state.calendar.clone(),
                state.config.calendar_timeout(),
            ),
        }
    }

    pub async fn get_slots(&self, query: &AvailabilityQuery) -> Result<Vec<TimeSlot>, AvailabilityError> {
        let date = parse_date(query.date.as_deref().unwrap_or_default())?;
        let clinic_id = query.clinic_id.as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.default_clinic_id.as_str());
        let service_id = query.service_id.as_deref().filter(|id| !id.trim().is_empty());

        self.check_availability(clinic_id, date, service_id, Utc::now()).await
    }

    pub async fn check_availability(
        &self,
        clinic_id: &str,
        date: NaiveDate,
        service_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimeSlot>, AvailabilityError> {
        debug!("Checking slots for clinic {} on {} (service: {})", clinic_id, date, service_id.unwrap_or("any"));

        let hours = self.working_hours.resolve(clinic_id, date).await?;
        if !hours.is_open {
            info!("Clinic {} is closed on {}", clinic_id, date);
            return Ok(Vec::new());
        }

        let qualified = self.specialists.qualified(clinic_id, service_id).await?;
        if qualified.is_empty() {
            info!("No qualified specialists for service {} at clinic {}, all slots unavailable",
                  service_id.unwrap_or("any"), clinic_id);
            return Ok(compute_slots(date, &hours, 0, &[]));
        }

        let busy = self.busy.collect(clinic_id, date, &qualified, now).await?;
        let slots = compute_slots(date, &hours, qualified.count(), &busy);

        info!("Clinic {} on {}: {}/{} slots available",
              clinic_id, date, slots.iter().filter(|s| s.available).count(), slots.len());

        Ok(slots)
    }
}
