//! Aggregate reports over events, registrations, attendance and feedback.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventStatus};
use crate::people::Student;
use crate::records::{Attendance, Feedback, Registration, Sentiment};
use crate::rules::Rejection;
use crate::{percentage, round2};

pub const DEFAULT_POPULARITY_LIMIT: i64 = 10;
pub const DEFAULT_PARTICIPATION_LIMIT: i64 = 50;
pub const DEFAULT_TOP_STUDENTS_LIMIT: i64 = 10;
pub const DEFAULT_DAYS_AHEAD: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityRow {
    pub event_id: i32,
    pub title: String,
    pub registrations: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub event_id: i32,
    pub title: String,
    pub registered: i32,
    pub attended: i64,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRow {
    pub event_id: i32,
    pub title: String,
    pub average_rating: f64,
    pub feedback_count: i64,
    #[serde(default)]
    pub sentiment_distribution: SentimentDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentParticipationRow {
    pub student_id: i32,
    pub name: String,
    pub email: String,
    pub events_attended: i64,
}

/// Events ordered by registrations, most popular first. Ties keep the input order.
#[must_use]
pub fn popularity(events: &[Event], limit: i64) -> Vec<PopularityRow> {
    let mut rows: Vec<PopularityRow> = events
        .iter()
        .map(|event| PopularityRow {
            event_id: event.id,
            title: event.title.clone(),
            registrations: event.registrations_count,
        })
        .collect();
    rows.sort_by(|a, b| b.registrations.cmp(&a.registrations));
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

fn attended_per_registration(attendance: &[Attendance]) -> HashMap<i32, bool> {
    attendance
        .iter()
        .map(|record| (record.registration_id, record.status.attended()))
        .collect()
}

#[must_use]
pub fn attendance(
    events: &[Event],
    registrations: &[Registration],
    attendance: &[Attendance],
) -> Vec<AttendanceRow> {
    let attended = attended_per_registration(attendance);
    let mut per_event: HashMap<i32, i64> = HashMap::new();
    for registration in registrations {
        if attended.get(&registration.id).copied().unwrap_or(false) {
            *per_event.entry(registration.event_id).or_default() += 1;
        }
    }
    events
        .iter()
        .map(|event| {
            let attended = per_event.get(&event.id).copied().unwrap_or(0);
            AttendanceRow {
                event_id: event.id,
                title: event.title.clone(),
                registered: event.registrations_count,
                attended,
                attendance_percentage: percentage(attended, event.registrations_count.into()),
            }
        })
        .collect()
}

#[must_use]
pub fn feedback(events: &[Event], feedback: &[Feedback]) -> Vec<FeedbackRow> {
    events
        .iter()
        .map(|event| {
            let mut distribution = SentimentDistribution::default();
            let mut sum = 0_i64;
            let mut count = 0_i64;
            for entry in feedback.iter().filter(|entry| entry.event_id == event.id) {
                sum += i64::from(entry.rating);
                count += 1;
                match entry.sentiment {
                    Sentiment::Positive => distribution.positive += 1,
                    Sentiment::Negative => distribution.negative += 1,
                    Sentiment::Neutral => distribution.neutral += 1,
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let average_rating = if count == 0 {
                0.0
            } else {
                round2(sum as f64 / count as f64)
            };
            FeedbackRow {
                event_id: event.id,
                title: event.title.clone(),
                average_rating,
                feedback_count: count,
                sentiment_distribution: distribution,
            }
        })
        .collect()
}

/// Students ordered by the number of events they attended, most active first.
#[must_use]
pub fn participation(
    students: &[Student],
    registrations: &[Registration],
    attendance: &[Attendance],
    limit: i64,
) -> Vec<StudentParticipationRow> {
    let attended = attended_per_registration(attendance);
    let mut per_student: HashMap<i32, i64> = HashMap::new();
    for registration in registrations {
        if attended.get(&registration.id).copied().unwrap_or(false) {
            *per_student.entry(registration.student_id).or_default() += 1;
        }
    }
    let mut rows: Vec<StudentParticipationRow> = students
        .iter()
        .map(|student| StudentParticipationRow {
            student_id: student.id,
            name: student.name.clone(),
            email: student.email.clone(),
            events_attended: per_student.get(&student.id).copied().unwrap_or(0),
        })
        .collect();
    rows.sort_by(|a, b| b.events_attended.cmp(&a.events_attended));
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

/// `None` for negative spans and spans too long for a [`Duration`].
#[must_use]
pub fn days_ahead_span(days_ahead: i64) -> Option<Duration> {
    if days_ahead < 0 {
        return None;
    }
    Duration::try_days(days_ahead)
}

/// End of the upcoming-events window, `None` when it does not fit a date.
#[must_use]
pub fn upcoming_until(now: NaiveDateTime, days_ahead: i64) -> Option<NaiveDateTime> {
    now.checked_add_signed(days_ahead_span(days_ahead)?)
}

/// Active events starting between `now` and `now + days_ahead`, soonest first.
pub fn upcoming(
    events: &[Event],
    now: NaiveDateTime,
    days_ahead: i64,
) -> Result<Vec<Event>, Rejection> {
    let until = upcoming_until(now, days_ahead).ok_or(Rejection::InvalidDaysAhead)?;
    let mut upcoming: Vec<Event> = events
        .iter()
        .filter(|event| {
            event.status == EventStatus::Active && event.date >= now && event.date <= until
        })
        .cloned()
        .collect();
    upcoming.sort_by_key(|event| event.date);
    Ok(upcoming)
}
