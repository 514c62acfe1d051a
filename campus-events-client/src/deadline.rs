use core::future::Future;
use core::time::Duration;

use campus_events_model::reports::{AttendanceRow, FeedbackRow, PopularityRow, StudentParticipationRow};
use campus_events_model::{
    Attendance, CheckInRequest, College, Event, EventFilter, Feedback, FeedbackRequest,
    Registration, RegistrationRequest,
};
use tracing::warn;

use crate::error::ApiError;
use crate::CampusApi;

/// Runs `future` for at most `timeout`. The future is dropped on expiry, which
/// cancels the request without touching any shared state.
pub async fn with_deadline<T, F>(timeout: Duration, future: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if let Ok(result) = tokio::time::timeout(timeout, future).await {
        result
    } else {
        warn!("request timed out after {timeout:?}");
        Err(ApiError::TimedOut(timeout))
    }
}

/// Wraps every call of the inner implementation in [`with_deadline`].
#[derive(Debug, Clone)]
pub struct Deadline<A> {
    inner: A,
    timeout: Duration,
}

impl<A> Deadline<A> {
    pub const fn new(inner: A, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub const fn inner(&self) -> &A {
        &self.inner
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<A: CampusApi> CampusApi for Deadline<A> {
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        with_deadline(self.timeout, self.inner.list_events(filter)).await
    }

    async fn list_colleges(&self) -> Result<Vec<College>, ApiError> {
        with_deadline(self.timeout, self.inner.list_colleges()).await
    }

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, ApiError> {
        with_deadline(self.timeout, self.inner.register(request)).await
    }

    async fn check_in(&self, request: CheckInRequest) -> Result<Attendance, ApiError> {
        with_deadline(self.timeout, self.inner.check_in(request)).await
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<Feedback, ApiError> {
        with_deadline(self.timeout, self.inner.submit_feedback(request)).await
    }

    async fn event_popularity(&self) -> Result<Vec<PopularityRow>, ApiError> {
        with_deadline(self.timeout, self.inner.event_popularity()).await
    }

    async fn attendance_report(&self) -> Result<Vec<AttendanceRow>, ApiError> {
        with_deadline(self.timeout, self.inner.attendance_report()).await
    }

    async fn feedback_report(&self) -> Result<Vec<FeedbackRow>, ApiError> {
        with_deadline(self.timeout, self.inner.feedback_report()).await
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<StudentParticipationRow>, ApiError> {
        with_deadline(self.timeout, self.inner.top_students(limit)).await
    }

    async fn upcoming_events(&self, days_ahead: i64) -> Result<Vec<Event>, ApiError> {
        with_deadline(self.timeout, self.inner.upcoming_events(days_ahead)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_futures_time_out() {
        let result: Result<(), ApiError> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(ApiError::TimedOut(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn fast_futures_keep_their_result() {
        let result = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(ApiError::Unknown("boom".to_owned()))
        })
        .await;
        assert_eq!(result, Err(ApiError::Unknown("boom".to_owned())));
    }
}
