use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::extractor::ClientIp;

use crate::models::{BookingLookupQuery, BookingView, ReservationError, ReserveSlotResponse, WebhookOutcome};
use crate::services::{PaymentService, ReservationService};
use crate::state::ReservationState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[axum::debug_handler]
pub async fn reserve_slot(
    State(state): State<ReservationState>,
    client_ip: ClientIp,
    body: Bytes,
) -> Result<Json<ReserveSlotResponse>, AppError> {
    let service = ReservationService::new(&state);
    let response = service.reserve_slot(&body, client_ip.as_str()).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<ReservationState>,
    Path(booking_id): Path<String>,
    Query(query): Query<BookingLookupQuery>,
) -> Result<Json<BookingView>, AppError> {
    let booking_id = Uuid::parse_str(booking_id.trim())
        .map_err(|_| ReservationError::ValidationError("Invalid booking id".to_string()))?;
    let clinic_id = query.clinic_id.as_deref().filter(|id| !id.trim().is_empty());

    let service = ReservationService::new(&state);
    let booking = service.get_booking(booking_id, clinic_id).await?;

    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<ReservationState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let service = PaymentService::new(&state);
    let outcome = service.handle_webhook(&body, signature).await?;

    Ok(Json(outcome))
}
