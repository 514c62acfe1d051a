use bytes::Bytes;
use campus_events_database as database;
use campus_events_model::{CheckInRequest, FeedbackRequest, RegistrationRequest};
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::info;

use crate::error::AppError;
use crate::{json_response, AppState};

pub async fn register(
    state: &AppState,
    request: RegistrationRequest,
) -> Result<Response<Full<Bytes>>, AppError> {
    let registration = database::register_student(&state.pool, request).await?;
    info!(
        registration_id = registration.id,
        student_id = registration.student_id,
        event_id = registration.event_id,
        "student registered"
    );
    Ok(json_response(StatusCode::OK, &registration))
}

pub async fn check_in(
    state: &AppState,
    request: CheckInRequest,
) -> Result<Response<Full<Bytes>>, AppError> {
    let attendance = database::check_in(&state.pool, request).await?;
    info!(
        registration_id = attendance.registration_id,
        status = %attendance.status,
        "student checked in"
    );
    Ok(json_response(StatusCode::OK, &attendance))
}

pub async fn feedback(
    state: &AppState,
    request: FeedbackRequest,
) -> Result<Response<Full<Bytes>>, AppError> {
    let feedback =
        database::submit_feedback(&state.pool, request, state.require_attendance).await?;
    info!(
        event_id = feedback.event_id,
        rating = feedback.rating,
        sentiment = %feedback.sentiment,
        "feedback submitted"
    );
    Ok(json_response(StatusCode::OK, &feedback))
}
