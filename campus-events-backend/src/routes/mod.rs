pub mod events;
pub mod people;
pub mod registration;
pub mod reports;

use core::str::FromStr;

use campus_events_model::reports::days_ahead_span;
use campus_events_model::{EventFilter, EventStatus, EventType};
use http_body_util::{BodyExt as _, Limited};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AppError;

const MAX_BODY_SIZE: usize = 64 * 1024;

/// Query parameters of all `GET` endpoints. Empty values count as absent so
/// that `?college_id=&status=active` only filters by status.
#[derive(Deserialize, Default, Debug)]
pub struct ApiQuery {
    event_type: Option<String>,
    college_id: Option<String>,
    status: Option<String>,
    limit: Option<String>,
    days_ahead: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

fn parse_parameter<T: FromStr>(
    name: &'static str,
    value: Option<&String>,
) -> Result<Option<T>, AppError> {
    non_empty(value)
        .map(|value| {
            value.parse().map_err(|_| AppError::InvalidParameter {
                name,
                value: value.to_owned(),
            })
        })
        .transpose()
}

impl ApiQuery {
    pub fn parse(query: Option<&str>) -> Result<Self, AppError> {
        Ok(query
            .map(serde_urlencoded::from_str)
            .transpose()?
            .unwrap_or_default())
    }

    pub fn filter(&self) -> Result<EventFilter, AppError> {
        Ok(EventFilter {
            event_type: non_empty(self.event_type.as_ref()).map(EventType::from),
            college_id: self.college_id()?,
            status: parse_parameter::<EventStatus>("status", self.status.as_ref())?,
        })
    }

    pub fn college_id(&self) -> Result<Option<i32>, AppError> {
        parse_parameter("college_id", self.college_id.as_ref())
    }

    pub fn limit(&self, default: i64) -> Result<i64, AppError> {
        Ok(parse_parameter("limit", self.limit.as_ref())?.unwrap_or(default))
    }

    /// Rejects spans that are negative or do not fit a date.
    pub fn days_ahead(&self, default: i64) -> Result<i64, AppError> {
        let days_ahead = parse_parameter("days_ahead", self.days_ahead.as_ref())?.unwrap_or(default);
        if days_ahead_span(days_ahead).is_none() {
            return Err(AppError::InvalidParameter {
                name: "days_ahead",
                value: days_ahead.to_string(),
            });
        }
        Ok(days_ahead)
    }
}

pub async fn read_json<T, B>(body: B) -> Result<T, AppError>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_BODY_SIZE)
        .collect()
        .await
        .map_err(|error| AppError::Body(error.to_string()))?
        .to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
