pub mod booking;
pub mod capacity;
pub mod clinic;
pub mod error;
pub mod wall_clock;

pub use booking::{Booking, BookingStatus};
pub use capacity::{overlaps, CapacityUsage};
pub use clinic::{Service, Specialist, WorkingHoursOverride};
pub use error::AppError;
