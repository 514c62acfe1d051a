use core::fmt::{self, Display};
use core::time::Duration;

use campus_events_model::{ErrorBody, Rejection, RejectionKind};
use http::StatusCode;

/// Business rule a registration or submission violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessRule {
    CapacityExceeded,
    EventNotActive,
    Other(String),
}

impl BusinessRule {
    /// Classifies the `detail` of a 400 response.
    #[must_use]
    pub fn from_detail(detail: &str) -> Self {
        let lowercase = detail.to_lowercase();
        if lowercase.contains("full capacity") {
            Self::CapacityExceeded
        } else if lowercase.contains("inactive") {
            Self::EventNotActive
        } else {
            Self::Other(detail.to_owned())
        }
    }
}

impl Display for BusinessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => f.write_str("capacity exceeded"),
            Self::EventNotActive => f.write_str("event not active"),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
    #[error("invalid request: {}", .detail.as_deref().unwrap_or("validation failed"))]
    Validation { detail: Option<String> },
    #[error("rejected ({rule}): {detail}")]
    BusinessRule { rule: BusinessRule, detail: String },
    #[error("not found: {}", .detail.as_deref().unwrap_or("unknown resource"))]
    NotFound { detail: Option<String> },
    #[error("unexpected response: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Maps a non-2xx response of the REST API onto the taxonomy.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .map(|body| body.detail);
        match status {
            StatusCode::BAD_REQUEST => {
                let detail = detail.unwrap_or_default();
                Self::BusinessRule {
                    rule: BusinessRule::from_detail(&detail),
                    detail,
                }
            }
            StatusCode::NOT_FOUND => Self::NotFound { detail },
            StatusCode::UNPROCESSABLE_ENTITY => Self::Validation { detail },
            status => Self::Unknown(detail.map_or_else(
                || status.to_string(),
                |detail| format!("{status}: {detail}"),
            )),
        }
    }

    /// The text the server gave as reason, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::BusinessRule { detail, .. } => Some(detail).filter(|detail| !detail.is_empty()).map(String::as_str),
            Self::Validation { detail } | Self::NotFound { detail } => detail.as_deref(),
            Self::Network(_) | Self::TimedOut(_) | Self::Unknown(_) => None,
        }
    }

    /// Message shown next to a form: the server's reason, or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::TimedOut(_) => "Request timed out".to_owned(),
            other => other
                .detail()
                .map_or_else(|| fallback.to_owned(), ToOwned::to_owned),
        }
    }

    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            Self::BusinessRule {
                rule: BusinessRule::CapacityExceeded,
                ..
            }
        )
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        let detail = rejection.to_string();
        match rejection.kind() {
            RejectionKind::NotFound => Self::NotFound {
                detail: Some(detail),
            },
            RejectionKind::BusinessRule => Self::BusinessRule {
                rule: BusinessRule::from_detail(&detail),
                detail,
            },
            RejectionKind::Validation => Self::Validation {
                detail: Some(detail),
            },
        }
    }
}

impl From<hyper::Error> for ApiError {
    fn from(value: hyper::Error) -> Self {
        Self::Network(value.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::Network(value.to_string())
    }
}

impl From<http::Error> for ApiError {
    fn from(value: http::Error) -> Self {
        Self::Unknown(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_requests_are_classified_by_detail() {
        let error = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            br#"{"detail":"Event is at full capacity"}"#,
        );
        assert!(error.is_capacity_exceeded());
        assert_eq!(error.user_message("Failed to register"), "Event is at full capacity");

        let error = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            br#"{"detail":"Cannot register for inactive events"}"#,
        );
        assert!(matches!(
            error,
            ApiError::BusinessRule {
                rule: BusinessRule::EventNotActive,
                ..
            }
        ));

        let error = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            br#"{"detail":"Student already registered for this event"}"#,
        );
        assert!(matches!(
            error,
            ApiError::BusinessRule {
                rule: BusinessRule::Other(_),
                ..
            }
        ));
    }

    #[test]
    fn other_statuses() {
        assert!(matches!(
            ApiError::from_response(StatusCode::NOT_FOUND, br#"{"detail":"Event not found"}"#),
            ApiError::NotFound { detail: Some(_) }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail":[]}"#),
            ApiError::Validation { detail: None }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::BAD_GATEWAY, b"<html>"),
            ApiError::Unknown(_)
        ));
    }

    #[test]
    fn fallback_message_without_detail() {
        let error = ApiError::Network("connection refused".to_owned());
        assert_eq!(error.user_message("Check-in failed"), "Check-in failed");
        let error = ApiError::from_response(StatusCode::BAD_REQUEST, b"");
        assert_eq!(error.user_message("Submission failed"), "Submission failed");
        assert_eq!(
            ApiError::TimedOut(Duration::from_secs(10)).user_message("Failed to register"),
            "Request timed out"
        );
    }

    #[test]
    fn rejections_use_the_same_taxonomy() {
        assert!(ApiError::from(Rejection::CapacityExceeded).is_capacity_exceeded());
        assert!(matches!(
            ApiError::from(Rejection::InvalidRating),
            ApiError::Validation { detail: Some(_) }
        ));
    }
}
