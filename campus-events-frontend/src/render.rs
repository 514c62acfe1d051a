//! Handlebars pages. Every page is rendered into `layout`.

use campus_events_model::{AttendanceStatus, College, Event, EventStatus, EventType};
use handlebars::Handlebars;
use http::StatusCode;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::capacity::CapacityHint;
use crate::dashboard::DashboardView;
use crate::error::FrontendError;
use crate::forms::{CheckInInput, FeedbackInput, FormPhase, FormState, RegistrationInput};
use crate::state::{AppState, View};

pub const INDEX_CSS: &str = include_str!("../static/index.css");

const TEMPLATES: [(&str, &str); 7] = [
    ("layout", include_str!("../templates/layout.hbs")),
    ("events", include_str!("../templates/events.hbs")),
    ("register", include_str!("../templates/register.hbs")),
    ("checkin", include_str!("../templates/checkin.hbs")),
    ("feedback", include_str!("../templates/feedback.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

static HANDLEBARS: Lazy<Result<Handlebars<'static>, String>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    for (name, source) in TEMPLATES {
        handlebars
            .register_template_string(name, source)
            .map_err(|error| format!("{name}: {error}"))?;
    }
    Ok(handlebars)
});

pub fn handlebars() -> Result<&'static Handlebars<'static>, FrontendError> {
    HANDLEBARS
        .as_ref()
        .map_err(|error| FrontendError::Template(error.clone()))
}

/// `<meta http-equiv="refresh">` target, the only navigation a page does on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refresh {
    pub seconds: String,
    pub url: String,
}

impl Refresh {
    #[must_use]
    pub fn after_millis(millis: u64, url: impl Into<String>) -> Self {
        Self {
            seconds: format!("{}.{}", millis / 1000, millis % 1000 / 100),
            url: url.into(),
        }
    }
}

#[derive(Serialize)]
struct Layout<'a> {
    title: &'a str,
    nav: &'static str,
    refresh: Option<&'a Refresh>,
    body: String,
}

const fn nav(view: View) -> &'static str {
    match view {
        View::Events | View::Register { .. } => "events",
        View::CheckIn => "checkin",
        View::Feedback => "feedback",
        View::Dashboard => "dashboard",
    }
}

fn page<T: Serialize>(
    template: &str,
    title: &str,
    view: View,
    refresh: Option<&Refresh>,
    data: &T,
) -> Result<String, FrontendError> {
    let handlebars = handlebars()?;
    let body = handlebars.render(template, data)?;
    Ok(handlebars.render(
        "layout",
        &Layout {
            title,
            nav: nav(view),
            refresh,
            body,
        },
    )?)
}

#[derive(Debug, Serialize)]
struct FormView<'a> {
    submitting: bool,
    success: Option<&'a str>,
    failure: Option<&'a str>,
}

impl<'a> From<&'a FormState> for FormView<'a> {
    fn from(form: &'a FormState) -> Self {
        let (success, failure) = match &form.phase {
            FormPhase::Succeeded { message, .. } => (Some(message.as_str()), None),
            FormPhase::Failed { message, .. } => (None, Some(message.as_str())),
            FormPhase::Idle | FormPhase::Submitting => (None, None),
        };
        Self {
            submitting: form.is_submitting(),
            success,
            failure,
        }
    }
}

#[derive(Debug, Serialize)]
struct Choice {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct EventCard<'a> {
    id: i32,
    title: &'a str,
    description: &'a str,
    event_type: &'a str,
    date: String,
    status: &'static str,
    college: Option<&'a str>,
    hint: CapacityHint,
}

impl<'a> EventCard<'a> {
    fn new(event: &'a Event, colleges: &'a [College]) -> Self {
        Self {
            id: event.id,
            title: &event.title,
            description: &event.description,
            event_type: event.event_type.as_str(),
            date: event.date.format("%Y-%m-%d %H:%M").to_string(),
            status: event.status.as_str(),
            college: colleges
                .iter()
                .find(|college| college.id == event.college_id)
                .map(|college| college.name.as_str()),
            hint: CapacityHint::of(event),
        }
    }
}

#[derive(Serialize)]
struct EventsPage<'a> {
    event_types: Vec<Choice>,
    colleges: Vec<Choice>,
    statuses: Vec<Choice>,
    events: Vec<EventCard<'a>>,
    error: Option<&'a str>,
    retry: String,
}

pub fn events_page(state: &AppState) -> Result<String, FrontendError> {
    let directory = &state.directory;
    let filter = &directory.filter;
    let mut event_types: Vec<Choice> = EventType::KNOWN
        .iter()
        .map(|event_type| Choice {
            value: event_type.as_str().to_owned(),
            label: event_type.as_str().to_owned(),
            selected: filter.event_type.as_ref() == Some(event_type),
        })
        .collect();
    if let Some(other @ EventType::Other(_)) = &filter.event_type {
        event_types.push(Choice {
            value: other.as_str().to_owned(),
            label: other.as_str().to_owned(),
            selected: true,
        });
    }
    let data = EventsPage {
        event_types,
        colleges: directory
            .colleges
            .iter()
            .map(|college| Choice {
                value: college.id.to_string(),
                label: college.name.clone(),
                selected: filter.college_id == Some(college.id),
            })
            .collect(),
        statuses: EventStatus::ALL
            .iter()
            .map(|status| Choice {
                value: status.as_str().to_owned(),
                label: status.as_str().to_owned(),
                selected: filter.status == Some(*status),
            })
            .collect(),
        events: directory
            .events
            .iter()
            .map(|event| EventCard::new(event, &directory.colleges))
            .collect(),
        error: directory.error.as_deref(),
        retry: crate::server::FilterQuery::from(filter).to_query_string(),
    };
    page("events", "Campus Events", state.view, None, &data)
}

#[derive(Serialize)]
struct RegisterPage<'a> {
    csrf_token: &'a str,
    event_id: i32,
    /// Absent when the event could not be looked up.
    event: Option<EventCard<'a>>,
    form: FormView<'a>,
    input: &'a RegistrationInput,
}

pub fn register_page(
    state: &AppState,
    csrf_token: &str,
    event_id: i32,
    event: Option<&Event>,
    input: &RegistrationInput,
    refresh: Option<&Refresh>,
) -> Result<String, FrontendError> {
    let data = RegisterPage {
        csrf_token,
        event_id,
        event: event.map(|event| EventCard::new(event, &state.directory.colleges)),
        form: FormView::from(&state.registration),
        input,
    };
    page("register", "Register for Event", state.view, refresh, &data)
}

#[derive(Serialize)]
struct CheckInPage<'a> {
    csrf_token: &'a str,
    form: FormView<'a>,
    input: &'a CheckInInput,
    statuses: Vec<Choice>,
}

pub fn check_in_page(
    state: &AppState,
    csrf_token: &str,
    input: &CheckInInput,
    refresh: Option<&Refresh>,
) -> Result<String, FrontendError> {
    let statuses = AttendanceStatus::ALL
        .iter()
        .map(|status| Choice {
            value: status.as_str().to_owned(),
            label: status.as_str().to_owned(),
            selected: input.status == status.as_str(),
        })
        .collect();
    let data = CheckInPage {
        csrf_token,
        form: FormView::from(&state.check_in),
        input,
        statuses,
    };
    page("checkin", "Event Check-In", state.view, refresh, &data)
}

#[derive(Serialize)]
struct FeedbackPage<'a> {
    csrf_token: &'a str,
    form: FormView<'a>,
    input: &'a FeedbackInput,
    events: Vec<Choice>,
    ratings: Vec<Choice>,
}

pub fn feedback_page(
    state: &AppState,
    csrf_token: &str,
    input: &FeedbackInput,
    refresh: Option<&Refresh>,
) -> Result<String, FrontendError> {
    let data = FeedbackPage {
        csrf_token,
        form: FormView::from(&state.feedback),
        input,
        events: state
            .directory
            .events
            .iter()
            .map(|event| Choice {
                value: event.id.to_string(),
                label: event.title.clone(),
                selected: input.event_id == event.id.to_string(),
            })
            .collect(),
        ratings: (1_usize..=5)
            .map(|rating| Choice {
                value: rating.to_string(),
                label: "★".repeat(rating),
                selected: input.rating == rating.to_string(),
            })
            .collect(),
    };
    page("feedback", "Event Feedback", state.view, refresh, &data)
}

#[derive(Serialize)]
struct DashboardPage<'a> {
    loading: bool,
    error: Option<&'a str>,
    reports: Option<DashboardView>,
}

pub fn dashboard_page(state: &AppState) -> Result<String, FrontendError> {
    let dashboard = &state.dashboard;
    let data = DashboardPage {
        loading: dashboard.loading,
        error: dashboard.error.as_deref(),
        reports: dashboard.data.as_ref().map(DashboardView::new),
    };
    page("dashboard", "Admin Dashboard", state.view, None, &data)
}

#[derive(Serialize)]
struct ErrorPage<'a> {
    status: u16,
    reason: &'a str,
    message: &'a str,
}

pub fn error_page(status: StatusCode, message: &str) -> Result<String, FrontendError> {
    let data = ErrorPage {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error"),
        message,
    };
    page("error", "Error", View::Events, None, &data)
}
