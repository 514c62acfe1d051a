//! Wire types of the campus events REST API together with the rules every
//! implementation of the registration service has to agree on.

pub mod event;
pub mod filter;
pub mod people;
pub mod records;
pub mod reports;
pub mod rules;

pub use event::{Event, EventStatus, EventType, NewEvent};
pub use filter::EventFilter;
pub use people::{College, EventManager, Student};
pub use records::{
    Attendance, AttendanceStatus, CheckInRequest, Feedback, FeedbackRequest, Registration,
    RegistrationRequest, Sentiment,
};
pub use rules::{Rejection, RejectionKind};

use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// `part / whole` in percent, rounded to two decimals. Zero when `whole` is zero.
#[must_use]
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let value = part as f64 / whole as f64 * 100.0;
    round2(value)
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert!((percentage(65, 75) - 86.67).abs() < f64::EPSILON);
        assert!((percentage(30, 35) - 85.71).abs() < f64::EPSILON);
        assert!((percentage(1, 2) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert!(percentage(3, 0).abs() < f64::EPSILON);
    }
}
