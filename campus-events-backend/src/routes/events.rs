use bytes::Bytes;
use campus_events_database as database;
use campus_events_model::NewEvent;
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::info;

use super::ApiQuery;
use crate::error::AppError;
use crate::{json_response, AppState};

pub async fn list(state: &AppState, query: &ApiQuery) -> Result<Response<Full<Bytes>>, AppError> {
    let events = database::list_events(&state.pool, &query.filter()?).await?;
    Ok(json_response(StatusCode::OK, &events))
}

pub async fn get(state: &AppState, event_id: i32) -> Result<Response<Full<Bytes>>, AppError> {
    let event = database::get_event(&state.pool, event_id).await?;
    Ok(json_response(StatusCode::OK, &event))
}

pub async fn create(
    state: &AppState,
    new_event: NewEvent,
) -> Result<Response<Full<Bytes>>, AppError> {
    let event = database::create_event(&state.pool, &new_event).await?;
    info!(event_id = event.id, title = event.title.as_str(), "event created");
    Ok(json_response(StatusCode::OK, &event))
}
