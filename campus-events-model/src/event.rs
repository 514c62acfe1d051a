use core::fmt::{self, Display};
use core::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Kind of an event. Unknown kinds are kept verbatim, known ones are matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Workshop,
    Seminar,
    Cultural,
    Conference,
    Sports,
    Exhibition,
    Symposium,
    Other(String),
}

impl EventType {
    pub const KNOWN: [Self; 7] = [
        Self::Conference,
        Self::Cultural,
        Self::Exhibition,
        Self::Seminar,
        Self::Sports,
        Self::Symposium,
        Self::Workshop,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Workshop => "Workshop",
            Self::Seminar => "Seminar",
            Self::Cultural => "Cultural",
            Self::Conference => "Conference",
            Self::Sports => "Sports",
            Self::Exhibition => "Exhibition",
            Self::Symposium => "Symposium",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "workshop" => Self::Workshop,
            "seminar" => Self::Seminar,
            "cultural" => Self::Cultural,
            "conference" => Self::Conference,
            "sports" => Self::Sports,
            "exhibition" => Self::Exhibition,
            "symposium" => Self::Symposium,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Closed,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Closed, Self::Cancelled];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown event status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownStatus(value.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub date: NaiveDateTime,
    pub capacity: i32,
    pub registrations_count: i32,
    pub status: EventStatus,
    pub college_id: i32,
    pub manager_id: i32,
}

impl Event {
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.registrations_count >= self.capacity
    }

    /// Whether the last known snapshot of this event would accept another
    /// registration. Only the registration service decides for real.
    #[must_use]
    pub fn accepts_registrations(&self) -> bool {
        self.status == EventStatus::Active && !self.is_full()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub date: NaiveDateTime,
    pub capacity: i32,
    pub college_id: i32,
    pub manager_id: i32,
    #[serde(default)]
    pub status: EventStatus,
}
