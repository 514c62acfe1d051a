use campus_events_model::Event;
use serde::Serialize;

/// What the event list shows about free seats. Derived from the last
/// snapshot only, so it may be stale. The registration form still has to
/// cope with a full event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityHint {
    pub registered: i32,
    pub capacity: i32,
    /// Fill level in percent, clamped to `0..=100`.
    pub percent: f64,
    pub label: String,
    pub can_register: bool,
    pub full: bool,
}

impl CapacityHint {
    #[must_use]
    pub fn of(event: &Event) -> Self {
        let percent = if event.capacity <= 0 {
            100.0
        } else {
            (f64::from(event.registrations_count) / f64::from(event.capacity)).clamp(0.0, 1.0)
                * 100.0
        };
        Self {
            registered: event.registrations_count,
            capacity: event.capacity,
            percent: campus_events_model::round2(percent),
            label: format!("{}/{}", event.registrations_count, event.capacity),
            can_register: event.accepts_registrations(),
            full: event.is_full(),
        }
    }
}
