use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use availability_cell::{AvailabilityState, CalendarReader, GoogleCalendarReader, NoCalendar};
use reservation_cell::{HumanVerifier, ReservationState, TurnstileVerifier};
use shared_config::{AppConfig, StoreBackend};
use shared_database::{BookingStore, InMemoryStore, ScheduleStore, SupabaseClient};

fn stores(config: &AppConfig) -> (Arc<dyn BookingStore>, Arc<dyn ScheduleStore>) {
    match config.store_backend {
        StoreBackend::Supabase => {
            let client = Arc::new(SupabaseClient::new(config));
            let bookings: Arc<dyn BookingStore> = client.clone();
            let schedule: Arc<dyn ScheduleStore> = client;
            (bookings, schedule)
        }
        StoreBackend::Memory => {
            warn!("Using the in-process booking store; bookings are lost on restart");
            let store = Arc::new(InMemoryStore::new());
            let bookings: Arc<dyn BookingStore> = store.clone();
            let schedule: Arc<dyn ScheduleStore> = store;
            (bookings, schedule)
        }
    }
}

fn calendar(config: &AppConfig) -> Arc<dyn CalendarReader> {
    if !config.is_calendar_configured() {
        info!("No calendar service account configured, availability uses bookings only");
        return Arc::new(NoCalendar);
    }

    match GoogleCalendarReader::from_config(config) {
        Ok(reader) => Arc::new(reader),
        Err(e) => {
            warn!("Calendar reader disabled: {:#}", e);
            Arc::new(NoCalendar)
        }
    }
}

fn verifier(config: &AppConfig) -> Option<Arc<dyn HumanVerifier>> {
    TurnstileVerifier::from_config(config).map(|v| Arc::new(v) as Arc<dyn HumanVerifier>)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    let (bookings, schedule) = stores(&config);
    let availability = AvailabilityState::new(config.clone(), bookings.clone(), schedule.clone(), calendar(&config));
    let reservation = ReservationState::new(config.clone(), bookings, schedule, verifier(&config));

    // Build the application router
    let app = router::create_router(availability, reservation)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        );

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
