use core::convert::Infallible;

use bytes::Bytes;
use campus_events_config::ConfigError;
use campus_events_database::DatabaseError;
use campus_events_model::{ErrorBody, RejectionKind};
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::{error, warn};

use crate::json_response;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("webserver error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Invalid request body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid query: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
    #[error("Invalid {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },
    #[error("Failed to read request body: {0}")]
    Body(String),
    #[error("Not Found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl From<Infallible> for AppError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(database_error) => match database_error.rejection() {
                Some(rejection) => match rejection.kind() {
                    RejectionKind::NotFound => StatusCode::NOT_FOUND,
                    RejectionKind::BusinessRule => StatusCode::BAD_REQUEST,
                    RejectionKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                },
                None => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Json(_) | Self::Query(_) | Self::InvalidParameter { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::File(_) | Self::Hyper(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text of the `detail` field. Internal failures are not leaked to clients.
    #[must_use]
    pub fn detail(&self) -> String {
        if self.status().is_server_error() {
            "Internal Server Error".to_owned()
        } else {
            self.to_string()
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!(status = status.as_u16(), "request rejected: {self}");
        }
        json_response(status, &ErrorBody::new(self.detail()))
    }
}

#[cfg(test)]
mod tests {
    use campus_events_model::Rejection;

    use super::*;

    #[test]
    fn rejections_map_to_status_and_detail() {
        let cases = [
            (Rejection::CapacityExceeded, StatusCode::BAD_REQUEST),
            (Rejection::EventNotActive, StatusCode::BAD_REQUEST),
            (Rejection::EventNotFound, StatusCode::NOT_FOUND),
            (Rejection::InvalidRating, StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (rejection, status) in cases {
            let error = AppError::from(DatabaseError::from(rejection));
            assert_eq!(error.status(), status);
            assert_eq!(error.detail(), rejection.to_string());
        }
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let error = AppError::from(DatabaseError::CorruptRow("event 1: bad".to_owned()));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.detail(), "Internal Server Error");
    }

    #[test]
    fn malformed_input_is_unprocessable() {
        let error = AppError::from(serde_json::from_str::<u8>("nope").unwrap_err());
        assert_eq!(error.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
