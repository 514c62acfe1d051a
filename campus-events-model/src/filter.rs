use serde::{Deserialize, Serialize};

use crate::event::{Event, EventStatus, EventType};

/// Constraints of an event directory query. Every supplied field must match,
/// an absent field does not constrain anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl EventFilter {
    #[must_use]
    pub fn active() -> Self {
        Self {
            status: Some(EventStatus::Active),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.event_type
            .as_ref()
            .map_or(true, |event_type| {
                event_type
                    .as_str()
                    .eq_ignore_ascii_case(event.event_type.as_str())
            })
            && self
                .college_id
                .map_or(true, |college_id| college_id == event.college_id)
            && self.status.map_or(true, |status| status == event.status)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.college_id.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn event(id: i32, event_type: EventType, college_id: i32, status: EventStatus) -> Event {
        Event {
            id,
            title: format!("event {id}"),
            description: String::new(),
            event_type,
            date: NaiveDate::from_ymd_opt(2025, 9, 13)
                .and_then(|date| date.and_hms_opt(10, 0, 0))
                .unwrap(),
            capacity: 10,
            registrations_count: 0,
            status,
            college_id,
            manager_id: 1,
        }
    }

    #[test]
    fn every_supplied_field_has_to_match() {
        let events = [
            event(1, EventType::Workshop, 1, EventStatus::Active),
            event(2, EventType::Workshop, 2, EventStatus::Active),
            event(3, EventType::Seminar, 1, EventStatus::Active),
            event(4, EventType::Workshop, 1, EventStatus::Closed),
        ];
        let types = [None, Some(EventType::Workshop), Some(EventType::Seminar)];
        let colleges = [None, Some(1), Some(2)];
        let statuses = [None, Some(EventStatus::Active), Some(EventStatus::Closed)];
        for event_type in &types {
            for college_id in colleges {
                for status in statuses {
                    let filter = EventFilter {
                        event_type: event_type.clone(),
                        college_id,
                        status,
                    };
                    for event in events.iter().filter(|event| filter.matches(event)) {
                        assert!(event_type.as_ref().map_or(true, |t| *t == event.event_type));
                        assert!(college_id.map_or(true, |c| c == event.college_id));
                        assert!(status.map_or(true, |s| s == event.status));
                    }
                }
            }
        }
    }

    #[test]
    fn event_types_compare_case_insensitively() {
        let hackathon = event(1, EventType::from("Hackathon"), 1, EventStatus::Active);
        for query in ["hackathon", "HACKATHON", "Hackathon"] {
            let filter = EventFilter {
                event_type: Some(EventType::from(query)),
                ..EventFilter::default()
            };
            assert!(filter.matches(&hackathon), "{query}");
        }
        let other = EventFilter {
            event_type: Some(EventType::from("hackathons")),
            ..EventFilter::default()
        };
        assert!(!other.matches(&hackathon));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EventFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&event(1, EventType::Sports, 9, EventStatus::Cancelled)));
    }
}
