use axum::{
    extract::{Query, State},
    Json,
};

use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, AvailabilityResponse};
use crate::services::AvailabilityService;
use crate::state::AvailabilityState;

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AvailabilityState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service.get_slots(&query).await?;

    Ok(Json(AvailabilityResponse { slots }))
}
