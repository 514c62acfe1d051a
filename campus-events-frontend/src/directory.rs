use campus_events_client::{ApiError, CampusApi};
use campus_events_model::{College, Event, EventFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one directory query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    pub events: Vec<Event>,
    pub colleges: Vec<College>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryState {
    pub filter: EventFilter,
    /// Bumped by every query. Only the newest query may fill the list.
    pub generation: u64,
    pub loading: bool,
    /// In the order the server returned them.
    pub events: Vec<Event>,
    pub colleges: Vec<College>,
    pub error: Option<String>,
}

impl DirectoryState {
    #[must_use]
    pub fn query(self, filter: EventFilter) -> Self {
        Self {
            filter,
            generation: self.generation + 1,
            loading: true,
            error: None,
            ..self
        }
    }

    /// Replaces the listed events, never merges them.
    #[must_use]
    pub fn loaded(self, generation: u64, result: Result<DirectoryPage, ApiError>) -> Self {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding superseded directory response"
            );
            return self;
        }
        match result {
            Ok(page) => Self {
                loading: false,
                events: page.events,
                colleges: page.colleges,
                error: None,
                ..self
            },
            Err(error) => Self {
                loading: false,
                events: Vec::new(),
                error: Some(error.user_message("Failed to load events")),
                ..self
            },
        }
    }

    #[must_use]
    pub fn event(&self, event_id: i32) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }
}

/// Events matching `filter` plus the colleges for the filter control.
pub async fn fetch<A: CampusApi>(api: &A, filter: &EventFilter) -> Result<DirectoryPage, ApiError> {
    let (events, colleges) = tokio::try_join!(api.list_events(filter), api.list_colleges())?;
    Ok(DirectoryPage { events, colleges })
}

#[cfg(test)]
mod tests {
    use campus_events_client::MemoryApi;
    use campus_events_model::{EventStatus, EventType};

    use super::*;

    #[tokio::test]
    async fn newer_queries_win() {
        let api = MemoryApi::seeded();
        let state = DirectoryState::default();

        let state = state.query(EventFilter::default());
        let everything = state.generation;
        let state = state.query(EventFilter {
            event_type: Some(EventType::Workshop),
            ..EventFilter::default()
        });
        let workshops = state.generation;

        let page = fetch(&api, &state.filter).await;
        let state = state.loaded(workshops, page);
        assert_eq!(state.events.len(), 1);

        let page = fetch(&api, &EventFilter::default()).await;
        let state = state.loaded(everything, page);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events[0].event_type, EventType::Workshop);
        assert_eq!(state.colleges.len(), 4);
    }

    #[tokio::test]
    async fn results_are_replaced_not_merged() {
        let api = MemoryApi::seeded();
        let state = DirectoryState::default().query(EventFilter {
            college_id: Some(1),
            ..EventFilter::default()
        });
        let generation = state.generation;
        let page = fetch(&api, &state.filter).await;
        let state = state.loaded(generation, page);
        assert_eq!(state.events.len(), 2);

        let state = state.query(EventFilter {
            college_id: Some(2),
            status: Some(EventStatus::Active),
            ..EventFilter::default()
        });
        assert!(state.loading);
        let generation = state.generation;
        let page = fetch(&api, &state.filter).await;
        let state = state.loaded(generation, page);
        assert_eq!(state.events.len(), 1);
        assert!(state.events.iter().all(|event| event.college_id == 2));
    }

    #[test]
    fn failures_leave_a_retrievable_error() {
        let state = DirectoryState::default().query(EventFilter::active());
        let state = state.loaded(1, Err(ApiError::Network("refused".to_owned())));
        assert!(!state.loading);
        assert!(state.events.is_empty());
        assert_eq!(state.error.as_deref(), Some("Failed to load events"));
        assert_eq!(state.filter, EventFilter::active());
    }
}
