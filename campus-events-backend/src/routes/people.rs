use bytes::Bytes;
use campus_events_database as database;
use http::{Response, StatusCode};
use http_body_util::Full;

use super::ApiQuery;
use crate::error::AppError;
use crate::{json_response, AppState};

pub async fn colleges(state: &AppState) -> Result<Response<Full<Bytes>>, AppError> {
    Ok(json_response(
        StatusCode::OK,
        &database::list_colleges(&state.pool).await?,
    ))
}

pub async fn students(
    state: &AppState,
    query: &ApiQuery,
) -> Result<Response<Full<Bytes>>, AppError> {
    Ok(json_response(
        StatusCode::OK,
        &database::list_students(&state.pool, query.college_id()?).await?,
    ))
}

pub async fn event_managers(state: &AppState) -> Result<Response<Full<Bytes>>, AppError> {
    Ok(json_response(
        StatusCode::OK,
        &database::list_event_managers(&state.pool).await?,
    ))
}
