use std::collections::HashSet;

/// Half-open overlap: `[a_start, a_end)` and `[b_start, b_end)` share time.
///
/// Touching intervals (one ends exactly where the other starts) do not
/// overlap.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

/// Specialist capacity consumed by a set of overlapping bookings.
///
/// Named specialists are tracked as a set so two bookings for the same
/// person count once; bookings without a specialist each take one unit
/// from the shared pool.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapacityUsage {
    named: HashSet<String>,
    unassigned: u32,
}

impl CapacityUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, specialist_id: Option<&str>) {
        match specialist_id {
            Some(id) => {
                self.named.insert(id.to_string());
            }
            None => self.unassigned += 1,
        }
    }

    pub fn is_named_busy(&self, specialist_id: &str) -> bool {
        self.named.contains(specialist_id)
    }

    pub fn named_count(&self) -> u32 {
        self.named.len() as u32
    }

    pub fn unassigned_count(&self) -> u32 {
        self.unassigned
    }

    pub fn used(&self) -> u32 {
        self.named_count() + self.unassigned
    }

    /// Remaining capacity, floored at zero.
    pub fn free(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.used())
    }
}
