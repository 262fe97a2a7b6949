use std::sync::Arc;

use tracing::debug;

use shared_database::ScheduleStore;

use crate::models::{AvailabilityError, QualifiedSpecialists};

pub struct SpecialistResolver {
    schedule: Arc<dyn ScheduleStore>,
}

impl SpecialistResolver {
    pub fn new(schedule: Arc<dyn ScheduleStore>) -> Self {
        Self { schedule }
    }

    /// Active specialists of the clinic, narrowed to those whose specialties
    /// include `service_id` when one is given.
    pub async fn qualified(
        &self,
        clinic_id: &str,
        service_id: Option<&str>,
    ) -> Result<QualifiedSpecialists, AvailabilityError> {
        let specialists = self.schedule.active_specialists(clinic_id).await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let ids: Vec<String> = specialists
            .into_iter()
            .filter(|s| s.is_active)
            .filter(|s| service_id.map_or(true, |service| s.can_perform(service)))
            .map(|s| s.id)
            .collect();

        debug!("Clinic {} has {} qualified specialists for service {}",
               clinic_id, ids.len(), service_id.unwrap_or("any"));

        Ok(QualifiedSpecialists::new(ids))
    }
}
