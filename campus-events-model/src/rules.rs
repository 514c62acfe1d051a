//! Decisions the registration service makes. The database backed service and
//! the in-memory one both go through these so they reject the same requests
//! with the same `detail` text.

use chrono::{Duration, NaiveDateTime};

use crate::event::{Event, EventStatus};
use crate::records::{AttendanceStatus, Sentiment};

/// Late arrivals are tolerated for this long after the event started.
pub const CHECK_IN_GRACE_MINUTES: i64 = 15;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NotFound,
    BusinessRule,
    Validation,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Event not found")]
    EventNotFound,
    #[error("Student not found")]
    StudentNotFound,
    #[error("College not found")]
    CollegeNotFound,
    #[error("Event manager not found")]
    ManagerNotFound,
    #[error("Registration not found")]
    RegistrationNotFound,
    #[error("Cannot register for inactive events")]
    EventNotActive,
    #[error("Event is at full capacity")]
    CapacityExceeded,
    #[error("Student already registered for this event")]
    AlreadyRegistered,
    #[error("Student already checked in")]
    AlreadyCheckedIn,
    #[error("Can only provide feedback for attended events")]
    NotAttended,
    #[error("Feedback already submitted for this event")]
    DuplicateFeedback,
    #[error("Rating must be between 1 and 5")]
    InvalidRating,
    #[error("Capacity must be a positive integer")]
    InvalidCapacity,
    #[error("days_ahead must be a non-negative number of days")]
    InvalidDaysAhead,
}

impl Rejection {
    const ALL: [Self; 14] = [
        Self::EventNotFound,
        Self::StudentNotFound,
        Self::CollegeNotFound,
        Self::ManagerNotFound,
        Self::RegistrationNotFound,
        Self::EventNotActive,
        Self::CapacityExceeded,
        Self::AlreadyRegistered,
        Self::AlreadyCheckedIn,
        Self::NotAttended,
        Self::DuplicateFeedback,
        Self::InvalidRating,
        Self::InvalidCapacity,
        Self::InvalidDaysAhead,
    ];

    #[must_use]
    pub const fn kind(self) -> RejectionKind {
        match self {
            Self::EventNotFound
            | Self::StudentNotFound
            | Self::CollegeNotFound
            | Self::ManagerNotFound
            | Self::RegistrationNotFound => RejectionKind::NotFound,
            Self::EventNotActive
            | Self::CapacityExceeded
            | Self::AlreadyRegistered
            | Self::AlreadyCheckedIn
            | Self::NotAttended
            | Self::DuplicateFeedback => RejectionKind::BusinessRule,
            Self::InvalidRating | Self::InvalidCapacity | Self::InvalidDaysAhead => {
                RejectionKind::Validation
            }
        }
    }

    /// Recovers the rejection from the `detail` text of an error response.
    #[must_use]
    pub fn from_detail(detail: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rejection| rejection.to_string() == detail.trim())
    }
}

/// Validates a registration against the current state of the event.
/// `registered` tells whether the student already holds a registration.
pub fn check_registration(
    event: Option<&Event>,
    student_exists: bool,
    registered: bool,
) -> Result<(), Rejection> {
    let event = event.ok_or(Rejection::EventNotFound)?;
    if event.status != EventStatus::Active {
        return Err(Rejection::EventNotActive);
    }
    if !student_exists {
        return Err(Rejection::StudentNotFound);
    }
    if event.is_full() {
        return Err(Rejection::CapacityExceeded);
    }
    if registered {
        return Err(Rejection::AlreadyRegistered);
    }
    Ok(())
}

pub const fn check_rating(rating: i32) -> Result<(), Rejection> {
    if rating < MIN_RATING || rating > MAX_RATING {
        return Err(Rejection::InvalidRating);
    }
    Ok(())
}

pub const fn check_capacity(capacity: i32) -> Result<(), Rejection> {
    if capacity <= 0 {
        return Err(Rejection::InvalidCapacity);
    }
    Ok(())
}

/// Status recorded for a check-in that did not state one explicitly.
#[must_use]
pub fn check_in_status(event_start: NaiveDateTime, checked_in_at: NaiveDateTime) -> AttendanceStatus {
    if checked_in_at <= event_start + Duration::minutes(CHECK_IN_GRACE_MINUTES) {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

const POSITIVE_WORDS: [&str; 9] = [
    "good",
    "great",
    "excellent",
    "amazing",
    "fantastic",
    "love",
    "awesome",
    "perfect",
    "wonderful",
];

const NEGATIVE_WORDS: [&str; 8] = [
    "bad",
    "terrible",
    "awful",
    "hate",
    "worst",
    "horrible",
    "disappointing",
    "poor",
];

/// Keyword scoring of a feedback comment.
#[must_use]
pub fn analyze_sentiment(comment: Option<&str>) -> Sentiment {
    let Some(comment) = comment.filter(|comment| !comment.trim().is_empty()) else {
        return Sentiment::Neutral;
    };
    let comment = comment.to_lowercase();
    let score = |words: &[&str]| words.iter().filter(|word| comment.contains(*word)).count();
    let positive = score(&POSITIVE_WORDS);
    let negative = score(&NEGATIVE_WORDS);
    match positive.cmp(&negative) {
        core::cmp::Ordering::Greater => Sentiment::Positive,
        core::cmp::Ordering::Less => Sentiment::Negative,
        core::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::event::EventType;

    fn event(capacity: i32, registrations_count: i32, status: EventStatus) -> Event {
        Event {
            id: 1,
            title: "AI Workshop".to_owned(),
            description: String::new(),
            event_type: EventType::Workshop,
            date: start(),
            capacity,
            registrations_count,
            status,
            college_id: 1,
            manager_id: 1,
        }
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 13)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    #[test]
    fn inactive_events_are_rejected_regardless_of_capacity() {
        for status in [EventStatus::Closed, EventStatus::Cancelled] {
            assert_eq!(
                check_registration(Some(&event(50, 0, status)), true, false),
                Err(Rejection::EventNotActive)
            );
        }
    }

    #[test]
    fn full_events_are_rejected() {
        assert_eq!(
            check_registration(Some(&event(50, 50, EventStatus::Active)), true, false),
            Err(Rejection::CapacityExceeded)
        );
        assert_eq!(
            check_registration(Some(&event(50, 49, EventStatus::Active)), true, false),
            Ok(())
        );
    }

    #[test]
    fn registration_checks_in_order() {
        assert_eq!(
            check_registration(None, false, false),
            Err(Rejection::EventNotFound)
        );
        assert_eq!(
            check_registration(Some(&event(50, 0, EventStatus::Active)), false, false),
            Err(Rejection::StudentNotFound)
        );
        assert_eq!(
            check_registration(Some(&event(50, 0, EventStatus::Active)), true, true),
            Err(Rejection::AlreadyRegistered)
        );
    }

    #[test]
    fn ratings_outside_one_to_five_are_invalid() {
        assert_eq!(check_rating(0), Err(Rejection::InvalidRating));
        assert_eq!(check_rating(6), Err(Rejection::InvalidRating));
        assert!((1..=5).all(|rating| check_rating(rating).is_ok()));
    }

    #[test]
    fn details_map_back_to_rejections() {
        assert_eq!(
            Rejection::from_detail("Event is at full capacity"),
            Some(Rejection::CapacityExceeded)
        );
        assert_eq!(Rejection::from_detail("something else"), None);
    }

    #[test]
    fn check_in_becomes_late_after_grace_period() {
        assert_eq!(
            check_in_status(start(), start() + Duration::minutes(15)),
            AttendanceStatus::Present
        );
        assert_eq!(
            check_in_status(start(), start() + Duration::minutes(16)),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn sentiment_counts_keywords() {
        assert_eq!(
            analyze_sentiment(Some("Great talk, loved it")),
            Sentiment::Positive
        );
        assert_eq!(
            analyze_sentiment(Some("terrible sound, poor slides")),
            Sentiment::Negative
        );
        assert_eq!(analyze_sentiment(Some("good but bad")), Sentiment::Neutral);
        assert_eq!(analyze_sentiment(None), Sentiment::Neutral);
    }
}
