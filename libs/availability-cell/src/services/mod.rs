pub mod availability;
pub mod busy;
pub mod calendar;
pub mod slots;
pub mod specialists;
pub mod working_hours;

pub use availability::AvailabilityService;
pub use busy::BusyIntervalAggregator;
pub use calendar::{CalendarReader, GoogleCalendarReader, NoCalendar};
pub use specialists::SpecialistResolver;
pub use working_hours::WorkingHoursResolver;
