use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use shared_models::{overlaps, CapacityUsage};

use crate::models::{BusyInterval, BusyScope, OpeningHours, TimeSlot};

/// Nominal width of every generated slot, independent of service duration.
pub const SLOT_MINUTES: i64 = 60;

fn slot_start(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour as i64)
}

/// Per-hour availability for one clinic day.
///
/// `capacity` is the number of qualified specialists. A global interval
/// overlapping a slot vetoes it outright; otherwise each distinct named
/// specialist and each unassigned booking overlapping the slot consumes
/// one unit.
pub fn compute_slots(
    date: NaiveDate,
    hours: &OpeningHours,
    capacity: u32,
    busy: &[BusyInterval],
) -> Vec<TimeSlot> {
    if !hours.is_open {
        return Vec::new();
    }

    (hours.open_hour..hours.close_hour)
        .map(|hour| {
            let time = format!("{:02}:00", hour);

            if capacity == 0 {
                return TimeSlot { time, available: false, available_specialists: 0 };
            }

            let start = slot_start(date, hour);
            let end = start + Duration::minutes(SLOT_MINUTES);
            let overlapping = busy.iter().filter(|b| overlaps(start, end, b.start, b.end));

            let mut usage = CapacityUsage::new();
            for interval in overlapping {
                match &interval.scope {
                    BusyScope::Global => {
                        return TimeSlot { time, available: false, available_specialists: 0 };
                    }
                    BusyScope::Specialist(id) => usage.record(Some(id.as_str())),
                    BusyScope::Unassigned => usage.record(None),
                }
            }

            let free = usage.free(capacity);
            TimeSlot { time, available: free > 0, available_specialists: free }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        date().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn open(open_hour: u32, close_hour: u32) -> OpeningHours {
        OpeningHours { is_open: true, open_hour, close_hour }
    }

    fn busy(scope: BusyScope, start: NaiveDateTime, end: NaiveDateTime) -> BusyInterval {
        BusyInterval { start, end, scope }
    }

    fn slot<'a>(slots: &'a [TimeSlot], time: &str) -> &'a TimeSlot {
        slots.iter().find(|s| s.time == time).unwrap()
    }

    #[test]
    fn closed_day_has_no_slots() {
        let global = busy(BusyScope::Global, at(9, 0), at(18, 0));
        assert!(compute_slots(date(), &OpeningHours::closed(), 3, &[global]).is_empty());
    }

    #[test]
    fn one_slot_per_open_hour() {
        let slots = compute_slots(date(), &open(9, 18), 2, &[]);
        let times: Vec<&str> = slots.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, ["09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00"]);
        assert!(slots.iter().all(|s| s.available && s.available_specialists == 2));
    }

    #[test]
    fn zero_capacity_marks_every_slot_unavailable() {
        let slots = compute_slots(date(), &open(9, 12), 0, &[]);
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| !s.available && s.available_specialists == 0));
    }

    #[test]
    fn global_interval_vetoes_overlapping_slots() {
        let intervals = [busy(BusyScope::Global, at(14, 0), at(15, 30))];
        let slots = compute_slots(date(), &open(9, 18), 5, &intervals);

        assert!(!slot(&slots, "14:00").available);
        assert_eq!(slot(&slots, "15:00").available_specialists, 0);
        assert_eq!(slot(&slots, "16:00").available_specialists, 5);
        assert_eq!(slot(&slots, "13:00").available_specialists, 5);
    }

    #[test]
    fn same_specialist_is_not_subtracted_twice() {
        let intervals = [
            busy(BusyScope::Specialist("anna".into()), at(10, 0), at(10, 30)),
            busy(BusyScope::Specialist("anna".into()), at(10, 30), at(11, 0)),
        ];
        let slots = compute_slots(date(), &open(9, 18), 2, &intervals);
        assert_eq!(slot(&slots, "10:00").available_specialists, 1);
    }

    #[test]
    fn unassigned_bookings_each_take_a_unit() {
        let intervals = [
            busy(BusyScope::Unassigned, at(11, 0), at(12, 0)),
            busy(BusyScope::Unassigned, at(11, 0), at(12, 0)),
            busy(BusyScope::Specialist("anna".into()), at(11, 0), at(12, 0)),
        ];
        let slots = compute_slots(date(), &open(9, 18), 2, &intervals);
        let eleven = slot(&slots, "11:00");
        assert!(!eleven.available);
        assert_eq!(eleven.available_specialists, 0);
    }

    #[test]
    fn touching_booking_does_not_block() {
        let intervals = [busy(BusyScope::Specialist("anna".into()), at(9, 0), at(10, 0))];
        let slots = compute_slots(date(), &open(9, 18), 1, &intervals);
        assert!(!slot(&slots, "09:00").available);
        assert!(slot(&slots, "10:00").available);
    }

    #[test]
    fn long_booking_spans_several_slots() {
        let intervals = [busy(BusyScope::Specialist("anna".into()), at(12, 30), at(14, 30))];
        let slots = compute_slots(date(), &open(9, 18), 1, &intervals);
        assert!(!slot(&slots, "12:00").available);
        assert!(!slot(&slots, "13:00").available);
        assert!(!slot(&slots, "14:00").available);
        assert!(slot(&slots, "15:00").available);
    }

    #[test]
    fn inverted_hours_yield_nothing() {
        assert!(compute_slots(date(), &open(18, 9), 2, &[]).is_empty());
    }
}
