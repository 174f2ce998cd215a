//! Wall-clock capability.

use chrono::NaiveDateTime;

/// Source of the run instant.
///
/// The same instant drives the daily-cycle hour, the run seed and the record
/// timestamp, so tests can pin all three with one fixed clock.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}
