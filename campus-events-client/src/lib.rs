//! Data access for the front end. Views only talk to a [`CampusApi`], which is
//! either the REST API over HTTP or an in-process [`MemoryApi`].

pub mod deadline;
pub mod error;
pub mod http;
pub mod memory;

use core::future::Future;

use campus_events_config::{ApiMode, Config};
use campus_events_model::reports::{
    AttendanceRow, FeedbackRow, PopularityRow, StudentParticipationRow,
};
use campus_events_model::{
    Attendance, CheckInRequest, College, Event, EventFilter, Feedback, FeedbackRequest,
    Registration, RegistrationRequest,
};
pub use deadline::{with_deadline, Deadline};
pub use error::{ApiError, BusinessRule};
pub use http::HttpApi;
pub use memory::{MemoryApi, MemoryStore};
use tracing::info;

/// Operations the front end needs. Implementations must not keep state between
/// calls that a second instance of the front end could not see.
pub trait CampusApi: Send + Sync {
    fn list_events(
        &self,
        filter: &EventFilter,
    ) -> impl Future<Output = Result<Vec<Event>, ApiError>> + Send;

    fn list_colleges(&self) -> impl Future<Output = Result<Vec<College>, ApiError>> + Send;

    /// Succeeds for at most `capacity - registrations_count` concurrent callers.
    fn register(
        &self,
        request: RegistrationRequest,
    ) -> impl Future<Output = Result<Registration, ApiError>> + Send;

    fn check_in(
        &self,
        request: CheckInRequest,
    ) -> impl Future<Output = Result<Attendance, ApiError>> + Send;

    fn submit_feedback(
        &self,
        request: FeedbackRequest,
    ) -> impl Future<Output = Result<Feedback, ApiError>> + Send;

    fn event_popularity(
        &self,
    ) -> impl Future<Output = Result<Vec<PopularityRow>, ApiError>> + Send;

    fn attendance_report(&self)
        -> impl Future<Output = Result<Vec<AttendanceRow>, ApiError>> + Send;

    fn feedback_report(&self) -> impl Future<Output = Result<Vec<FeedbackRow>, ApiError>> + Send;

    fn top_students(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<StudentParticipationRow>, ApiError>> + Send;

    fn upcoming_events(
        &self,
        days_ahead: i64,
    ) -> impl Future<Output = Result<Vec<Event>, ApiError>> + Send;
}

/// The implementation selected by configuration.
#[derive(Debug, Clone)]
pub enum Backend {
    Http(HttpApi),
    Memory(MemoryApi),
}

macro_rules! delegate {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            Backend::Http(api) => api.$method($($arg),*).await,
            Backend::Memory(api) => api.$method($($arg),*).await,
        }
    };
}

impl CampusApi for Backend {
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        delegate!(self, list_events(filter))
    }

    async fn list_colleges(&self) -> Result<Vec<College>, ApiError> {
        delegate!(self, list_colleges())
    }

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, ApiError> {
        delegate!(self, register(request))
    }

    async fn check_in(&self, request: CheckInRequest) -> Result<Attendance, ApiError> {
        delegate!(self, check_in(request))
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<Feedback, ApiError> {
        delegate!(self, submit_feedback(request))
    }

    async fn event_popularity(&self) -> Result<Vec<PopularityRow>, ApiError> {
        delegate!(self, event_popularity())
    }

    async fn attendance_report(&self) -> Result<Vec<AttendanceRow>, ApiError> {
        delegate!(self, attendance_report())
    }

    async fn feedback_report(&self) -> Result<Vec<FeedbackRow>, ApiError> {
        delegate!(self, feedback_report())
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<StudentParticipationRow>, ApiError> {
        delegate!(self, top_students(limit))
    }

    async fn upcoming_events(&self, days_ahead: i64) -> Result<Vec<Event>, ApiError> {
        delegate!(self, upcoming_events(days_ahead))
    }
}

/// Builds the configured implementation with the configured request timeout.
pub fn connect(config: &Config) -> Result<Deadline<Backend>, ApiError> {
    let backend = match config.api.mode {
        ApiMode::Http => {
            info!(base_url = config.api.base_url.as_str(), "using the REST API");
            Backend::Http(HttpApi::new(&config.api.base_url)?)
        }
        ApiMode::Memory => {
            info!("using the in-memory store");
            Backend::Memory(
                MemoryApi::seeded().with_require_attendance(config.feedback.require_attendance),
            )
        }
    };
    Ok(Deadline::new(backend, config.api.timeout()))
}
