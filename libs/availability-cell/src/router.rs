use axum::{routing::get, Router};

use shared_utils::cors::widget_cors;

use crate::handlers;
use crate::state::AvailabilityState;

pub fn availability_routes(state: AvailabilityState) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability))
        .layer(widget_cors())
        .with_state(state)
}
