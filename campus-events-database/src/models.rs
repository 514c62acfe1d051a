use campus_events_model::{
    Attendance, College, Event, EventManager, Feedback, Registration, Student,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::error::DatabaseError;
use crate::schema::{
    attendance, colleges, event_managers, events, feedback, registrations, students,
};

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub date: NaiveDateTime,
    pub capacity: i32,
    pub registrations_count: i32,
    pub status: String,
    pub college_id: i32,
    pub manager_id: i32,
}

impl TryFrom<EventRow> for Event {
    type Error = DatabaseError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|error| DatabaseError::CorruptRow(format!("event {}: {error}", row.id)))?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            event_type: row.event_type.into(),
            date: row.date,
            capacity: row.capacity,
            registrations_count: row.registrations_count,
            status,
            college_id: row.college_id,
            manager_id: row.manager_id,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
pub struct NewEventRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub event_type: &'a str,
    pub date: NaiveDateTime,
    pub capacity: i32,
    pub registrations_count: i32,
    pub status: &'a str,
    pub college_id: i32,
    pub manager_id: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = colleges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CollegeRow {
    pub id: i32,
    pub name: String,
}

impl From<CollegeRow> for College {
    fn from(row: CollegeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StudentRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub college_id: i32,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            college_id: row.college_id,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = event_managers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventManagerRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub college_id: i32,
}

impl From<EventManagerRow> for EventManager {
    fn from(row: EventManagerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            college_id: row.college_id,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RegistrationRow {
    pub id: i32,
    pub student_id: i32,
    pub event_id: i32,
    pub timestamp: NaiveDateTime,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            event_id: row.event_id,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = attendance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttendanceRow {
    pub id: i32,
    pub registration_id: i32,
    pub checkin_time: NaiveDateTime,
    pub status: String,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = DatabaseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|error| {
            DatabaseError::CorruptRow(format!("attendance {}: {error}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            registration_id: row.registration_id,
            checkin_time: row.checkin_time,
            status,
        })
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = feedback)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FeedbackRow {
    pub id: i32,
    pub student_id: i32,
    pub event_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub sentiment: String,
    pub created_at: NaiveDateTime,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        let sentiment = match row.sentiment.parse() {
            Ok(sentiment) => sentiment,
            Err(infallible) => match infallible {},
        };
        Self {
            id: row.id,
            student_id: row.student_id,
            event_id: row.event_id,
            rating: row.rating,
            comment: row.comment,
            sentiment,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use campus_events_model::{AttendanceStatus, EventStatus, EventType, Sentiment};
    use chrono::NaiveDate;

    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 13)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    fn event_row(status: &str) -> EventRow {
        EventRow {
            id: 1,
            title: "AI Workshop".to_owned(),
            description: "Intro".to_owned(),
            event_type: "workshop".to_owned(),
            date: at(),
            capacity: 50,
            registrations_count: 35,
            status: status.to_owned(),
            college_id: 1,
            manager_id: 1,
        }
    }

    #[test]
    fn event_rows_convert() {
        let event = Event::try_from(event_row("active")).unwrap();
        assert_eq!(event.event_type, EventType::Workshop);
        assert_eq!(event.status, EventStatus::Active);
    }

    #[test]
    fn unknown_status_is_a_corrupt_row() {
        assert!(matches!(
            Event::try_from(event_row("postponed")),
            Err(DatabaseError::CorruptRow(_))
        ));
    }

    #[test]
    fn legacy_attendance_rows_convert() {
        let attendance = Attendance::try_from(AttendanceRow {
            id: 1,
            registration_id: 9,
            checkin_time: at(),
            status: "on-time".to_owned(),
        })
        .unwrap();
        assert_eq!(attendance.status, AttendanceStatus::Present);
    }

    #[test]
    fn feedback_rows_keep_sentiment() {
        let feedback = Feedback::from(FeedbackRow {
            id: 1,
            student_id: 1,
            event_id: 5,
            rating: 5,
            comment: Some("Great event!".to_owned()),
            sentiment: "positive".to_owned(),
            created_at: at(),
        });
        assert_eq!(feedback.sentiment, Sentiment::Positive);
    }
}
