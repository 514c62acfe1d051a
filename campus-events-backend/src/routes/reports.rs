use bytes::Bytes;
use campus_events_database as database;
use campus_events_model::reports::{
    DEFAULT_DAYS_AHEAD, DEFAULT_PARTICIPATION_LIMIT, DEFAULT_POPULARITY_LIMIT,
    DEFAULT_TOP_STUDENTS_LIMIT,
};
use campus_events_model::EventFilter;
use http::{Response, StatusCode};
use http_body_util::Full;

use super::ApiQuery;
use crate::error::AppError;
use crate::{json_response, AppState};

/// Reports only narrow events by college and type, never by status.
fn report_filter(query: &ApiQuery) -> Result<EventFilter, AppError> {
    Ok(EventFilter {
        status: None,
        ..query.filter()?
    })
}

pub async fn event_popularity(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let rows = database::event_popularity(
        &state.pool,
        &report_filter(query)?,
        query.limit(DEFAULT_POPULARITY_LIMIT)?,
    )
    .await?;
    Ok(json_response(StatusCode::OK, &rows))
}

pub async fn attendance(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let rows = database::attendance_report(&state.pool, &report_filter(query)?).await?;
    Ok(json_response(StatusCode::OK, &rows))
}

pub async fn feedback(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let rows = database::feedback_report(&state.pool, &report_filter(query)?).await?;
    Ok(json_response(StatusCode::OK, &rows))
}

pub async fn student_participation(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let rows = database::student_participation(
        &state.pool,
        query.college_id()?,
        query.limit(DEFAULT_PARTICIPATION_LIMIT)?,
    )
    .await?;
    Ok(json_response(StatusCode::OK, &rows))
}

pub async fn top_students(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let rows =
        database::top_students(&state.pool, query.limit(DEFAULT_TOP_STUDENTS_LIMIT)?).await?;
    Ok(json_response(StatusCode::OK, &rows))
}

pub async fn upcoming_events(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    let events = database::upcoming_events(
        &state.pool,
        query.college_id()?,
        query.days_ahead(DEFAULT_DAYS_AHEAD)?,
    )
    .await?;
    Ok(json_response(StatusCode::OK, &events))
}
