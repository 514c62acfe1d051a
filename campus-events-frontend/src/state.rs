//! The whole front-end state of one browser session. It only changes through
//! [`reduce`], which never performs I/O.

use campus_events_client::ApiError;
use campus_events_config::UiConfig;
use campus_events_model::EventFilter;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dashboard::{DashboardData, DashboardState};
use crate::directory::{DirectoryPage, DirectoryState};
use crate::forms::{FormKind, FormState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum View {
    #[default]
    Events,
    Register {
        event_id: i32,
    },
    CheckIn,
    Feedback,
    Dashboard,
}

const MAX_DISPLAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub redirect_delay_ms: u64,
    pub message_duration_ms: u64,
}

impl From<&UiConfig> for Timings {
    fn from(ui: &UiConfig) -> Self {
        Self {
            redirect_delay_ms: ui.redirect_delay_ms,
            message_duration_ms: ui.message_duration_ms,
        }
    }
}

impl Timings {
    #[must_use]
    pub fn message_duration(&self) -> Duration {
        let millis = i64::try_from(self.message_duration_ms).unwrap_or(MAX_DISPLAY_MS);
        Duration::milliseconds(millis.min(MAX_DISPLAY_MS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub view: View,
    pub directory: DirectoryState,
    pub registration: FormState,
    pub check_in: FormState,
    pub feedback: FormState,
    pub dashboard: DashboardState,
    pub timings: Timings,
}

impl AppState {
    #[must_use]
    pub fn new(timings: Timings) -> Self {
        Self {
            view: View::default(),
            directory: DirectoryState::default(),
            registration: FormState::new(FormKind::Registration),
            check_in: FormState::new(FormKind::CheckIn),
            feedback: FormState::new(FormKind::Feedback),
            dashboard: DashboardState::default(),
            timings,
        }
    }

    #[must_use]
    pub const fn form(&self, kind: FormKind) -> &FormState {
        match kind {
            FormKind::Registration => &self.registration,
            FormKind::CheckIn => &self.check_in,
            FormKind::Feedback => &self.feedback,
        }
    }

    fn map_form(self, kind: FormKind, f: impl FnOnce(FormState) -> FormState) -> Self {
        match kind {
            FormKind::Registration => Self {
                registration: f(self.registration),
                ..self
            },
            FormKind::CheckIn => Self {
                check_in: f(self.check_in),
                ..self
            },
            FormKind::Feedback => Self {
                feedback: f(self.feedback),
                ..self
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(View),
    QueryEvents(EventFilter),
    EventsLoaded {
        generation: u64,
        result: Result<DirectoryPage, ApiError>,
    },
    OpenForm(FormKind),
    Submit(FormKind),
    Invalid {
        form: FormKind,
        message: String,
        now: NaiveDateTime,
    },
    Completed {
        form: FormKind,
        generation: u64,
        outcome: Result<(), ApiError>,
        now: NaiveDateTime,
    },
    /// The submission of `generation` ended without an outcome.
    Abandoned {
        form: FormKind,
        generation: u64,
    },
    /// Clears success and failure messages whose display time is over.
    Expire(NaiveDateTime),
    LoadDashboard,
    DashboardLoaded {
        generation: u64,
        result: Result<DashboardData, ApiError>,
    },
}

#[must_use]
pub fn reduce(state: AppState, action: Action) -> AppState {
    let display_for = state.timings.message_duration();
    match action {
        Action::Navigate(view) => AppState { view, ..state },
        Action::QueryEvents(filter) => AppState {
            directory: state.directory.query(filter),
            ..state
        },
        Action::EventsLoaded { generation, result } => AppState {
            directory: state.directory.loaded(generation, result),
            ..state
        },
        Action::OpenForm(kind) => state.map_form(kind, FormState::open),
        Action::Submit(kind) => state.map_form(kind, FormState::submit),
        Action::Invalid { form, message, now } => {
            state.map_form(form, |form| form.invalid(message, now, display_for))
        }
        Action::Completed {
            form,
            generation,
            outcome,
            now,
        } => state.map_form(form, |form| {
            form.complete(generation, &outcome, now, display_for)
        }),
        Action::Abandoned { form, generation } => {
            state.map_form(form, |form| form.abandon(generation))
        }
        Action::Expire(now) => AppState {
            registration: state.registration.expire(now),
            check_in: state.check_in.expire(now),
            feedback: state.feedback.expire(now),
            ..state
        },
        Action::LoadDashboard => AppState {
            dashboard: state.dashboard.load(),
            ..state
        },
        Action::DashboardLoaded { generation, result } => AppState {
            dashboard: state.dashboard.loaded(generation, result),
            ..state
        },
    }
}
