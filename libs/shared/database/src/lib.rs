pub mod memory;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use store::{BookingStore, ReserveOutcome, ScheduleStore, SlotReservation, SLOT_ALREADY_BOOKED};
pub use supabase::SupabaseClient;
