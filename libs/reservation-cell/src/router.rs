use axum::{
    routing::{get, post},
    Router,
};

use shared_utils::cors::widget_cors;

use crate::handlers;
use crate::state::ReservationState;

pub fn reservation_routes(state: ReservationState) -> Router {
    Router::new()
        .route("/reserve-slot", post(handlers::reserve_slot))
        .route("/bookings/{booking_id}", get(handlers::get_booking))
        .route("/webhook/payment", post(handlers::payment_webhook))
        .layer(widget_cors())
        .with_state(state)
}
