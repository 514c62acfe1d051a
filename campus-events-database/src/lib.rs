//! PostgreSQL backed system of record. Every write that has to respect an
//! invariant (capacity, one registration per student, one check-in per
//! registration) runs inside a transaction.

pub mod error;
pub mod models;
pub mod schema;

use campus_events_model::{
    reports, rules, Attendance, CheckInRequest, College, Event, EventFilter, EventManager,
    EventStatus, Feedback, FeedbackRequest, NewEvent, Registration, RegistrationRequest,
    Rejection, Student,
};
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::{exists, sql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::sql_types::Bool;
use diesel_async::pooled_connection::deadpool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
pub use error::DatabaseError;
use models::{
    AttendanceRow, CollegeRow, EventManagerRow, EventRow, FeedbackRow, NewEventRow,
    RegistrationRow, StudentRow,
};
use schema::{attendance, colleges, event_managers, events, feedback, registrations, students};
use tracing::debug;

pub type Pool = deadpool::Pool<AsyncPgConnection>;

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub fn get_database_connection(database_url: &str) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(config).build()?)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Escapes the `LIKE` wildcards so the pattern only matches the literal text.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

type EventPredicate = Box<dyn BoxableExpression<events::table, Pg, SqlType = Bool>>;

fn event_predicate(filter: &EventFilter) -> EventPredicate {
    let mut predicate: EventPredicate = Box::new(sql::<Bool>("TRUE"));
    if let Some(event_type) = &filter.event_type {
        predicate = Box::new(
            predicate.and(events::event_type.ilike(escape_like(event_type.as_str()))),
        );
    }
    if let Some(college_id) = filter.college_id {
        predicate = Box::new(predicate.and(events::college_id.eq(college_id)));
    }
    if let Some(status) = filter.status {
        predicate = Box::new(predicate.and(events::status.eq(status.as_str())));
    }
    predicate
}

fn is_unique_violation(error: &diesel::result::Error) -> bool {
    matches!(
        error,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<Event>, DatabaseError> {
    rows.into_iter().map(Event::try_from).collect()
}

pub async fn list_events(pool: &Pool, filter: &EventFilter) -> Result<Vec<Event>, DatabaseError> {
    let mut connection = pool.get().await?;
    let rows = events::table
        .filter(event_predicate(filter))
        .order_by(events::id.asc())
        .select(EventRow::as_select())
        .load(&mut connection)
        .await?;
    into_events(rows)
}

pub async fn get_event(pool: &Pool, event_id: i32) -> Result<Event, DatabaseError> {
    let mut connection = pool.get().await?;
    let row = events::table
        .find(event_id)
        .select(EventRow::as_select())
        .first(&mut connection)
        .await
        .optional()?
        .ok_or(Rejection::EventNotFound)?;
    Event::try_from(row)
}

pub async fn create_event(pool: &Pool, new_event: &NewEvent) -> Result<Event, DatabaseError> {
    rules::check_capacity(new_event.capacity)?;
    let mut connection = pool.get().await?;
    let college_exists = diesel::select(exists(colleges::table.find(new_event.college_id)))
        .get_result::<bool>(&mut connection)
        .await?;
    if !college_exists {
        return Err(Rejection::CollegeNotFound.into());
    }
    let manager_exists = diesel::select(exists(event_managers::table.find(new_event.manager_id)))
        .get_result::<bool>(&mut connection)
        .await?;
    if !manager_exists {
        return Err(Rejection::ManagerNotFound.into());
    }
    let row = diesel::insert_into(events::table)
        .values(NewEventRow {
            title: &new_event.title,
            description: &new_event.description,
            event_type: new_event.event_type.as_str(),
            date: new_event.date,
            capacity: new_event.capacity,
            registrations_count: 0,
            status: new_event.status.as_str(),
            college_id: new_event.college_id,
            manager_id: new_event.manager_id,
        })
        .returning(EventRow::as_returning())
        .get_result(&mut connection)
        .await?;
    debug!(event_id = row.id, "created event");
    Event::try_from(row)
}

pub async fn list_colleges(pool: &Pool) -> Result<Vec<College>, DatabaseError> {
    let mut connection = pool.get().await?;
    Ok(colleges::table
        .order_by(colleges::id.asc())
        .select(CollegeRow::as_select())
        .load(&mut connection)
        .await?
        .into_iter()
        .map(College::from)
        .collect())
}

pub async fn list_students(
    pool: &Pool,
    college_id: Option<i32>,
) -> Result<Vec<Student>, DatabaseError> {
    let mut connection = pool.get().await?;
    let mut query = students::table
        .order_by(students::id.asc())
        .select(StudentRow::as_select())
        .into_boxed();
    if let Some(college_id) = college_id {
        query = query.filter(students::college_id.eq(college_id));
    }
    Ok(query
        .load(&mut connection)
        .await?
        .into_iter()
        .map(Student::from)
        .collect())
}

pub async fn list_event_managers(pool: &Pool) -> Result<Vec<EventManager>, DatabaseError> {
    let mut connection = pool.get().await?;
    Ok(event_managers::table
        .order_by(event_managers::id.asc())
        .select(EventManagerRow::as_select())
        .load(&mut connection)
        .await?
        .into_iter()
        .map(EventManager::from)
        .collect())
}

/// Registers a student for an event. The seat is taken by a single
/// conditional update, so of two concurrent requests for the last seat exactly
/// one succeeds.
pub async fn register_student(
    pool: &Pool,
    request: RegistrationRequest,
) -> Result<Registration, DatabaseError> {
    let mut connection = pool.get().await?;
    connection
        .transaction::<_, DatabaseError, _>(|connection| {
            async move {
                let event = events::table
                    .find(request.event_id)
                    .select(EventRow::as_select())
                    .first(connection)
                    .await
                    .optional()?
                    .map(Event::try_from)
                    .transpose()?;
                let student_exists =
                    diesel::select(exists(students::table.find(request.student_id)))
                        .get_result::<bool>(connection)
                        .await?;
                let registered = diesel::select(exists(
                    registrations::table
                        .filter(registrations::student_id.eq(request.student_id))
                        .filter(registrations::event_id.eq(request.event_id)),
                ))
                .get_result::<bool>(connection)
                .await?;
                rules::check_registration(event.as_ref(), student_exists, registered)?;

                let taken = diesel::update(
                    events::table
                        .find(request.event_id)
                        .filter(events::status.eq(EventStatus::Active.as_str()))
                        .filter(events::registrations_count.lt(events::capacity)),
                )
                .set(events::registrations_count.eq(events::registrations_count + 1))
                .execute(connection)
                .await?;
                if taken == 0 {
                    // someone else changed the event since we read it
                    let current = events::table
                        .find(request.event_id)
                        .select(EventRow::as_select())
                        .first(connection)
                        .await
                        .optional()?
                        .map(Event::try_from)
                        .transpose()?;
                    rules::check_registration(current.as_ref(), true, false)?;
                    return Err(Rejection::CapacityExceeded.into());
                }

                let row = diesel::insert_into(registrations::table)
                    .values((
                        registrations::student_id.eq(request.student_id),
                        registrations::event_id.eq(request.event_id),
                        registrations::timestamp.eq(now()),
                    ))
                    .returning(RegistrationRow::as_returning())
                    .get_result(connection)
                    .await
                    .map_err(|error| {
                        if is_unique_violation(&error) {
                            DatabaseError::from(Rejection::AlreadyRegistered)
                        } else {
                            error.into()
                        }
                    })?;
                debug!(
                    registration_id = row.id,
                    event_id = row.event_id,
                    "registered student"
                );
                Ok(Registration::from(row))
            }
            .scope_boxed()
        })
        .await
}

pub async fn check_in(pool: &Pool, request: CheckInRequest) -> Result<Attendance, DatabaseError> {
    let mut connection = pool.get().await?;
    connection
        .transaction::<_, DatabaseError, _>(|connection| {
            async move {
                let (_registration, event) = registrations::table
                    .inner_join(events::table)
                    .filter(registrations::id.eq(request.registration_id))
                    .select((RegistrationRow::as_select(), EventRow::as_select()))
                    .first::<(RegistrationRow, EventRow)>(connection)
                    .await
                    .optional()?
                    .ok_or(Rejection::RegistrationNotFound)?;
                let checked_in = diesel::select(exists(
                    attendance::table
                        .filter(attendance::registration_id.eq(request.registration_id)),
                ))
                .get_result::<bool>(connection)
                .await?;
                if checked_in {
                    return Err(Rejection::AlreadyCheckedIn.into());
                }
                let checkin_time = now();
                let status = request
                    .status
                    .unwrap_or_else(|| rules::check_in_status(event.date, checkin_time));
                let row = diesel::insert_into(attendance::table)
                    .values((
                        attendance::registration_id.eq(request.registration_id),
                        attendance::checkin_time.eq(checkin_time),
                        attendance::status.eq(status.as_str()),
                    ))
                    .returning(AttendanceRow::as_returning())
                    .get_result(connection)
                    .await
                    .map_err(|error| {
                        if is_unique_violation(&error) {
                            DatabaseError::from(Rejection::AlreadyCheckedIn)
                        } else {
                            error.into()
                        }
                    })?;
                Attendance::try_from(row)
            }
            .scope_boxed()
        })
        .await
}

/// Stores feedback of a student. With `require_attendance` only students that
/// were checked in as present or late may leave feedback.
pub async fn submit_feedback(
    pool: &Pool,
    request: FeedbackRequest,
    require_attendance: bool,
) -> Result<Feedback, DatabaseError> {
    rules::check_rating(request.rating)?;
    let mut connection = pool.get().await?;
    connection
        .transaction::<_, DatabaseError, _>(|connection| {
            async move {
                let event_exists = diesel::select(exists(events::table.find(request.event_id)))
                    .get_result::<bool>(connection)
                    .await?;
                if !event_exists {
                    return Err(Rejection::EventNotFound.into());
                }
                let student_exists =
                    diesel::select(exists(students::table.find(request.student_id)))
                        .get_result::<bool>(connection)
                        .await?;
                if !student_exists {
                    return Err(Rejection::StudentNotFound.into());
                }
                if require_attendance {
                    let statuses = attendance::table
                        .inner_join(registrations::table)
                        .filter(registrations::student_id.eq(request.student_id))
                        .filter(registrations::event_id.eq(request.event_id))
                        .select(AttendanceRow::as_select())
                        .load(connection)
                        .await?
                        .into_iter()
                        .map(Attendance::try_from)
                        .collect::<Result<Vec<_>, _>>()?;
                    if !statuses.iter().any(|record| record.status.attended()) {
                        return Err(Rejection::NotAttended.into());
                    }
                }
                let duplicate = diesel::select(exists(
                    feedback::table
                        .filter(feedback::student_id.eq(request.student_id))
                        .filter(feedback::event_id.eq(request.event_id)),
                ))
                .get_result::<bool>(connection)
                .await?;
                if duplicate {
                    return Err(Rejection::DuplicateFeedback.into());
                }
                let sentiment = rules::analyze_sentiment(request.comment.as_deref());
                let row = diesel::insert_into(feedback::table)
                    .values((
                        feedback::student_id.eq(request.student_id),
                        feedback::event_id.eq(request.event_id),
                        feedback::rating.eq(request.rating),
                        feedback::comment.eq(request.comment.as_deref()),
                        feedback::sentiment.eq(sentiment.as_str()),
                        feedback::created_at.eq(now()),
                    ))
                    .returning(FeedbackRow::as_returning())
                    .get_result(connection)
                    .await
                    .map_err(|error| {
                        if is_unique_violation(&error) {
                            DatabaseError::from(Rejection::DuplicateFeedback)
                        } else {
                            error.into()
                        }
                    })?;
                Ok(Feedback::from(row))
            }
            .scope_boxed()
        })
        .await
}

pub async fn event_popularity(
    pool: &Pool,
    filter: &EventFilter,
    limit: i64,
) -> Result<Vec<reports::PopularityRow>, DatabaseError> {
    let mut connection = pool.get().await?;
    let rows = events::table
        .filter(event_predicate(filter))
        .order_by((events::registrations_count.desc(), events::id.asc()))
        .limit(limit.max(0))
        .select(EventRow::as_select())
        .load(&mut connection)
        .await?;
    Ok(reports::popularity(&into_events(rows)?, limit))
}

/// Which registrations a report has to look at.
enum RegistrationScope<'a> {
    Events(&'a [i32]),
    Students(&'a [i32]),
}

async fn registrations_and_attendance(
    connection: &mut deadpool::Object<AsyncPgConnection>,
    scope: RegistrationScope<'_>,
) -> Result<(Vec<Registration>, Vec<Attendance>), DatabaseError> {
    let mut query = registrations::table
        .order_by(registrations::id.asc())
        .select(RegistrationRow::as_select())
        .into_boxed();
    query = match scope {
        RegistrationScope::Events(event_ids) => {
            query.filter(registrations::event_id.eq_any(event_ids.to_vec()))
        }
        RegistrationScope::Students(student_ids) => {
            query.filter(registrations::student_id.eq_any(student_ids.to_vec()))
        }
    };
    let registrations: Vec<Registration> = query
        .load(connection)
        .await?
        .into_iter()
        .map(Registration::from)
        .collect();
    let registration_ids: Vec<i32> = registrations
        .iter()
        .map(|registration| registration.id)
        .collect();
    let attendance = attendance::table
        .filter(attendance::registration_id.eq_any(registration_ids))
        .select(AttendanceRow::as_select())
        .load(connection)
        .await?
        .into_iter()
        .map(Attendance::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((registrations, attendance))
}

pub async fn attendance_report(
    pool: &Pool,
    filter: &EventFilter,
) -> Result<Vec<reports::AttendanceRow>, DatabaseError> {
    let mut connection = pool.get().await?;
    let events = into_events(
        events::table
            .filter(event_predicate(filter))
            .order_by(events::id.asc())
            .select(EventRow::as_select())
            .load(&mut connection)
            .await?,
    )?;
    if events.is_empty() {
        return Ok(Vec::new());
    }
    let event_ids: Vec<i32> = events.iter().map(|event| event.id).collect();
    let (registrations, attendance) =
        registrations_and_attendance(&mut connection, RegistrationScope::Events(&event_ids)).await?;
    Ok(reports::attendance(&events, &registrations, &attendance))
}

pub async fn feedback_report(
    pool: &Pool,
    filter: &EventFilter,
) -> Result<Vec<reports::FeedbackRow>, DatabaseError> {
    let mut connection = pool.get().await?;
    let events = into_events(
        events::table
            .filter(event_predicate(filter))
            .order_by(events::id.asc())
            .select(EventRow::as_select())
            .load(&mut connection)
            .await?,
    )?;
    let event_ids: Vec<i32> = events.iter().map(|event| event.id).collect();
    let entries: Vec<Feedback> = feedback::table
        .filter(feedback::event_id.eq_any(event_ids))
        .select(FeedbackRow::as_select())
        .load(&mut connection)
        .await?
        .into_iter()
        .map(Feedback::from)
        .collect();
    Ok(reports::feedback(&events, &entries))
}

/// Students ranked by attended events, optionally restricted to one college.
pub async fn student_participation(
    pool: &Pool,
    college_id: Option<i32>,
    limit: i64,
) -> Result<Vec<reports::StudentParticipationRow>, DatabaseError> {
    let mut connection = pool.get().await?;
    let mut query = students::table
        .order_by(students::id.asc())
        .select(StudentRow::as_select())
        .into_boxed();
    if let Some(college_id) = college_id {
        query = query.filter(students::college_id.eq(college_id));
    }
    let students: Vec<Student> = query
        .load(&mut connection)
        .await?
        .into_iter()
        .map(Student::from)
        .collect();
    if students.is_empty() {
        return Ok(Vec::new());
    }
    let student_ids: Vec<i32> = students.iter().map(|student| student.id).collect();
    let (registrations, attendance) =
        registrations_and_attendance(&mut connection, RegistrationScope::Students(&student_ids))
            .await?;
    Ok(reports::participation(
        &students,
        &registrations,
        &attendance,
        limit,
    ))
}

pub async fn top_students(
    pool: &Pool,
    limit: i64,
) -> Result<Vec<reports::StudentParticipationRow>, DatabaseError> {
    student_participation(pool, None, limit).await
}

pub async fn upcoming_events(
    pool: &Pool,
    college_id: Option<i32>,
    days_ahead: i64,
) -> Result<Vec<Event>, DatabaseError> {
    let from = now();
    let until =
        reports::upcoming_until(from, days_ahead).ok_or(Rejection::InvalidDaysAhead)?;
    let mut connection = pool.get().await?;
    let mut query = events::table
        .filter(events::status.eq(EventStatus::Active.as_str()))
        .filter(events::date.ge(from))
        .filter(events::date.le(until))
        .order_by((events::date.asc(), events::id.asc()))
        .select(EventRow::as_select())
        .into_boxed();
    if let Some(college_id) = college_id {
        query = query.filter(events::college_id.eq(college_id));
    }
    into_events(query.load(&mut connection).await?)
}
