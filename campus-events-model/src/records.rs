use core::fmt::{self, Display};
use core::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: i32,
    pub student_id: i32,
    pub event_id: i32,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub student_id: i32,
    pub event_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub const ALL: [Self; 3] = [Self::Present, Self::Absent, Self::Late];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
        }
    }

    /// Whether the student was physically there.
    #[must_use]
    pub const fn attended(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown attendance status {0:?}")]
pub struct UnknownAttendanceStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownAttendanceStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // older records used on-time for present
        if value.eq_ignore_ascii_case("on-time") {
            return Ok(Self::Present);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownAttendanceStatus(value.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i32,
    pub registration_id: i32,
    pub checkin_time: NaiveDateTime,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub registration_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = core::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i32,
    pub student_id: i32,
    pub event_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub sentiment: Sentiment,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub student_id: i32,
    pub event_id: i32,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_request_omits_missing_status() {
        let request = CheckInRequest {
            registration_id: 7,
            status: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"registration_id":7}"#
        );
    }

    #[test]
    fn legacy_on_time_status_is_present() {
        assert_eq!(
            "on-time".parse::<AttendanceStatus>(),
            Ok(AttendanceStatus::Present)
        );
        assert!(!AttendanceStatus::Absent.attended());
        assert!(AttendanceStatus::Late.attended());
    }
}
