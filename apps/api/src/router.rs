use axum::{routing::get, Router};

use availability_cell::{availability_routes, AvailabilityState};
use reservation_cell::{reservation_routes, ReservationState};

pub fn create_router(availability: AvailabilityState, reservation: ReservationState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .merge(availability_routes(availability))
        .merge(reservation_routes(reservation))
}
