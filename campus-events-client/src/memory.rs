//! In-process stand-in for the REST API. It enforces the same rules as the
//! database backed service and serializes every decision through one lock.

use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use campus_events_model::reports::{
    self, AttendanceRow, FeedbackRow, PopularityRow, StudentParticipationRow,
    DEFAULT_POPULARITY_LIMIT,
};
use campus_events_model::{
    rules, Attendance, AttendanceStatus, CheckInRequest, College, Event, EventFilter,
    EventManager, EventStatus, EventType, Feedback, FeedbackRequest, NewEvent, Registration,
    RegistrationRequest, Rejection, Sentiment, Student,
};
use chrono::{NaiveDateTime, Utc};
use tracing::debug;

use crate::error::ApiError;
use crate::CampusApi;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub colleges: Vec<College>,
    pub students: Vec<Student>,
    pub event_managers: Vec<EventManager>,
    pub events: Vec<Event>,
    pub registrations: Vec<Registration>,
    pub attendance: Vec<Attendance>,
    pub feedback: Vec<Feedback>,
}

fn next_id<T>(rows: &[T], id: impl Fn(&T) -> i32) -> i32 {
    rows.iter().map(id).max().unwrap_or(0) + 1
}

impl MemoryStore {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Colleges, staff, students and five events around `now`, one of them in the past.
    #[must_use]
    pub fn seeded(now: NaiveDateTime) -> Self {
        let colleges = [
            "Engineering College",
            "Business School",
            "Arts & Science College",
            "Medical College",
        ]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| College {
            id,
            name: name.to_owned(),
        })
        .collect();
        let event_managers = [
            ("Dr. Smith", "smith@engineering.edu"),
            ("Prof. Johnson", "johnson@business.edu"),
            ("Ms. Wilson", "wilson@arts.edu"),
            ("Dr. Brown", "brown@medical.edu"),
        ]
        .into_iter()
        .zip(1..)
        .map(|((name, email), id)| EventManager {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            college_id: id,
        })
        .collect();
        let students = [
            ("Alice Cooper", "alice", 1),
            ("Bob Smith", "bob", 1),
            ("Carol Johnson", "carol", 2),
            ("David Wilson", "david", 2),
            ("Eve Brown", "eve", 3),
            ("Frank Davis", "frank", 3),
            ("Grace Miller", "grace", 4),
            ("Henry Taylor", "henry", 4),
            ("Ivy Anderson", "ivy", 1),
            ("Jack Thomas", "jack", 2),
        ]
        .into_iter()
        .zip(1..)
        .map(|((name, mailbox, college_id), id)| Student {
            id,
            name: name.to_owned(),
            email: format!("{mailbox}@student.edu"),
            college_id,
        })
        .collect();
        let events = [
            (
                "AI Workshop",
                "Introduction to Artificial Intelligence and Machine Learning",
                EventType::Workshop,
                7,
                50,
                35,
                1,
            ),
            (
                "Business Strategy Seminar",
                "Modern approaches to business strategy and planning",
                EventType::Seminar,
                14,
                100,
                75,
                2,
            ),
            (
                "Cultural Festival",
                "Annual inter-college cultural festival",
                EventType::Cultural,
                21,
                200,
                150,
                3,
            ),
            (
                "Medical Conference",
                "Latest developments in medical research",
                EventType::Conference,
                28,
                80,
                60,
                4,
            ),
            (
                "Sports Day",
                "Inter-college sports competition",
                EventType::Sports,
                -7,
                300,
                250,
                1,
            ),
        ]
        .into_iter()
        .zip(1..)
        .map(
            |((title, description, event_type, days, capacity, registrations_count, college_id), id)| {
                Event {
                    id,
                    title: title.to_owned(),
                    description: description.to_owned(),
                    event_type,
                    date: now + chrono::Duration::days(days),
                    capacity,
                    registrations_count,
                    status: EventStatus::Active,
                    college_id,
                    manager_id: college_id,
                }
            },
        )
        .collect();
        let registrations = [
            (1, 1, 5),
            (2, 1, 4),
            (3, 2, 6),
            (4, 2, 3),
            (5, 3, 8),
            (6, 3, 2),
            (7, 4, 9),
            (8, 4, 1),
            (1, 5, 10),
            (3, 5, 9),
        ]
        .into_iter()
            .zip(1..)
            .map(|((student_id, event_id, days_ago), id)| Registration {
                id,
                student_id,
                event_id,
                timestamp: now - chrono::Duration::days(days_ago),
            })
            .collect();
        let attendance = vec![
            Attendance {
                id: 1,
                registration_id: 9,
                checkin_time: now - chrono::Duration::days(7),
                status: AttendanceStatus::Present,
            },
            Attendance {
                id: 2,
                registration_id: 10,
                checkin_time: now - chrono::Duration::days(7) + chrono::Duration::minutes(20),
                status: AttendanceStatus::Late,
            },
        ];
        let feedback = vec![
            Feedback {
                id: 1,
                student_id: 1,
                event_id: 5,
                rating: 5,
                comment: Some("Great event! Very well organized.".to_owned()),
                sentiment: Sentiment::Positive,
                created_at: now - chrono::Duration::days(6),
            },
            Feedback {
                id: 2,
                student_id: 3,
                event_id: 5,
                rating: 4,
                comment: Some("Good experience, could be improved.".to_owned()),
                sentiment: Sentiment::Positive,
                created_at: now - chrono::Duration::days(6),
            },
        ];
        Self {
            colleges,
            students,
            event_managers,
            events,
            registrations,
            attendance,
            feedback,
        }
    }

    fn event(&self, event_id: i32) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }

    fn student_exists(&self, student_id: i32) -> bool {
        self.students.iter().any(|student| student.id == student_id)
    }

    pub fn create_event(&mut self, new_event: NewEvent) -> Result<Event, Rejection> {
        rules::check_capacity(new_event.capacity)?;
        if !self
            .colleges
            .iter()
            .any(|college| college.id == new_event.college_id)
        {
            return Err(Rejection::CollegeNotFound);
        }
        if !self
            .event_managers
            .iter()
            .any(|manager| manager.id == new_event.manager_id)
        {
            return Err(Rejection::ManagerNotFound);
        }
        let event = Event {
            id: next_id(&self.events, |event| event.id),
            title: new_event.title,
            description: new_event.description,
            event_type: new_event.event_type,
            date: new_event.date,
            capacity: new_event.capacity,
            registrations_count: 0,
            status: new_event.status,
            college_id: new_event.college_id,
            manager_id: new_event.manager_id,
        };
        self.events.push(event.clone());
        Ok(event)
    }

    /// Check and increment happen under the same `&mut self`, so a seat can not be given out twice.
    pub fn register(
        &mut self,
        request: RegistrationRequest,
        now: NaiveDateTime,
    ) -> Result<Registration, Rejection> {
        let registered = self.registrations.iter().any(|registration| {
            registration.student_id == request.student_id
                && registration.event_id == request.event_id
        });
        rules::check_registration(
            self.event(request.event_id),
            self.student_exists(request.student_id),
            registered,
        )?;
        let event = self
            .events
            .iter_mut()
            .find(|event| event.id == request.event_id)
            .ok_or(Rejection::EventNotFound)?;
        event.registrations_count += 1;
        let registration = Registration {
            id: next_id(&self.registrations, |registration| registration.id),
            student_id: request.student_id,
            event_id: request.event_id,
            timestamp: now,
        };
        self.registrations.push(registration.clone());
        Ok(registration)
    }

    pub fn check_in(
        &mut self,
        request: CheckInRequest,
        now: NaiveDateTime,
    ) -> Result<Attendance, Rejection> {
        let registration = self
            .registrations
            .iter()
            .find(|registration| registration.id == request.registration_id)
            .ok_or(Rejection::RegistrationNotFound)?;
        let event = self
            .event(registration.event_id)
            .ok_or(Rejection::EventNotFound)?;
        if self
            .attendance
            .iter()
            .any(|record| record.registration_id == request.registration_id)
        {
            return Err(Rejection::AlreadyCheckedIn);
        }
        let record = Attendance {
            id: next_id(&self.attendance, |record| record.id),
            registration_id: request.registration_id,
            checkin_time: now,
            status: request
                .status
                .unwrap_or_else(|| rules::check_in_status(event.date, now)),
        };
        self.attendance.push(record.clone());
        Ok(record)
    }

    fn attended(&self, student_id: i32, event_id: i32) -> bool {
        self.registrations
            .iter()
            .filter(|registration| {
                registration.student_id == student_id && registration.event_id == event_id
            })
            .any(|registration| {
                self.attendance.iter().any(|record| {
                    record.registration_id == registration.id && record.status.attended()
                })
            })
    }

    pub fn submit_feedback(
        &mut self,
        request: FeedbackRequest,
        require_attendance: bool,
        now: NaiveDateTime,
    ) -> Result<Feedback, Rejection> {
        rules::check_rating(request.rating)?;
        if self.event(request.event_id).is_none() {
            return Err(Rejection::EventNotFound);
        }
        if !self.student_exists(request.student_id) {
            return Err(Rejection::StudentNotFound);
        }
        if require_attendance && !self.attended(request.student_id, request.event_id) {
            return Err(Rejection::NotAttended);
        }
        if self.feedback.iter().any(|entry| {
            entry.student_id == request.student_id && entry.event_id == request.event_id
        }) {
            return Err(Rejection::DuplicateFeedback);
        }
        let entry = Feedback {
            id: next_id(&self.feedback, |entry| entry.id),
            student_id: request.student_id,
            event_id: request.event_id,
            rating: request.rating,
            sentiment: rules::analyze_sentiment(request.comment.as_deref()),
            comment: request.comment,
            created_at: now,
        };
        self.feedback.push(entry.clone());
        Ok(entry)
    }
}

/// Shared handle to a [`MemoryStore`]. Clones see the same data.
#[derive(Debug, Clone)]
pub struct MemoryApi {
    store: Arc<Mutex<MemoryStore>>,
    latency: Duration,
    require_attendance: bool,
}

impl MemoryApi {
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            latency: Duration::ZERO,
            require_attendance: true,
        }
    }

    #[must_use]
    pub fn seeded() -> Self {
        Self::new(MemoryStore::seeded(Utc::now().naive_utc()))
    }

    /// Every call waits this long before it is processed.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub const fn with_require_attendance(mut self, require_attendance: bool) -> Self {
        self.require_attendance = require_attendance;
        self
    }

    /// A panicking test must not wedge every other user of the store.
    pub fn store(&self) -> MutexGuard<'_, MemoryStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event, ApiError> {
        self.wait().await;
        Ok(self.store().create_event(new_event)?)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl CampusApi for MemoryApi {
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        self.wait().await;
        Ok(self
            .store()
            .events
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }

    async fn list_colleges(&self) -> Result<Vec<College>, ApiError> {
        self.wait().await;
        Ok(self.store().colleges.clone())
    }

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, ApiError> {
        self.wait().await;
        let registration = self
            .store()
            .register(request, Utc::now().naive_utc())?;
        debug!(registration_id = registration.id, "registered in memory");
        Ok(registration)
    }

    async fn check_in(&self, request: CheckInRequest) -> Result<Attendance, ApiError> {
        self.wait().await;
        Ok(self.store().check_in(request, Utc::now().naive_utc())?)
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<Feedback, ApiError> {
        self.wait().await;
        Ok(self
            .store()
            .submit_feedback(request, self.require_attendance, Utc::now().naive_utc())?)
    }

    async fn event_popularity(&self) -> Result<Vec<PopularityRow>, ApiError> {
        self.wait().await;
        Ok(reports::popularity(
            &self.store().events,
            DEFAULT_POPULARITY_LIMIT,
        ))
    }

    async fn attendance_report(&self) -> Result<Vec<AttendanceRow>, ApiError> {
        self.wait().await;
        let store = self.store();
        Ok(reports::attendance(
            &store.events,
            &store.registrations,
            &store.attendance,
        ))
    }

    async fn feedback_report(&self) -> Result<Vec<FeedbackRow>, ApiError> {
        self.wait().await;
        let store = self.store();
        Ok(reports::feedback(&store.events, &store.feedback))
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<StudentParticipationRow>, ApiError> {
        self.wait().await;
        let store = self.store();
        Ok(reports::participation(
            &store.students,
            &store.registrations,
            &store.attendance,
            limit,
        ))
    }

    async fn upcoming_events(&self, days_ahead: i64) -> Result<Vec<Event>, ApiError> {
        self.wait().await;
        Ok(reports::upcoming(
            &self.store().events,
            Utc::now().naive_utc(),
            days_ahead,
        )?)
    }
}
