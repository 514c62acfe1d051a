use http::Method;

use crate::error::AppError;

/// Every endpoint of the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListEvents,
    CreateEvent,
    GetEvent(i32),
    ListColleges,
    ListStudents,
    ListEventManagers,
    Register,
    CheckIn,
    SubmitFeedback,
    EventPopularity,
    AttendanceReport,
    FeedbackReport,
    StudentParticipation,
    TopStudents,
    UpcomingEvents,
}

impl Route {
    /// Trailing slashes are ignored, `/events/` is the same as `/events`.
    pub fn resolve(method: &Method, path: &str) -> Result<Self, AppError> {
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        let (get, post) = match segments.as_slice() {
            ["events"] => (Some(Self::ListEvents), Some(Self::CreateEvent)),
            ["events", id] => {
                let id = id.parse().map_err(|_| AppError::InvalidParameter {
                    name: "event id",
                    value: (*id).to_owned(),
                })?;
                (Some(Self::GetEvent(id)), None)
            }
            ["colleges"] => (Some(Self::ListColleges), None),
            ["students"] => (Some(Self::ListStudents), None),
            ["event-managers"] => (Some(Self::ListEventManagers), None),
            ["students", "register"] => (None, Some(Self::Register)),
            ["attendance", "checkin"] => (None, Some(Self::CheckIn)),
            ["feedback"] => (None, Some(Self::SubmitFeedback)),
            ["reports", "event-popularity"] => (Some(Self::EventPopularity), None),
            ["reports", "attendance"] => (Some(Self::AttendanceReport), None),
            ["reports", "feedback"] => (Some(Self::FeedbackReport), None),
            ["reports", "student-participation"] => (Some(Self::StudentParticipation), None),
            ["reports", "top-students"] => (Some(Self::TopStudents), None),
            ["reports", "upcoming-events"] => (Some(Self::UpcomingEvents), None),
            _ => return Err(AppError::NotFound),
        };
        let route = match *method {
            Method::GET | Method::HEAD => get,
            Method::POST => post,
            _ => None,
        };
        route.ok_or(AppError::MethodNotAllowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_accepted() {
        assert_eq!(
            Route::resolve(&Method::GET, "/events/").unwrap(),
            Route::ListEvents
        );
        assert_eq!(
            Route::resolve(&Method::POST, "/students/register/").unwrap(),
            Route::Register
        );
        assert_eq!(
            Route::resolve(&Method::GET, "/reports/top-students/").unwrap(),
            Route::TopStudents
        );
    }

    #[test]
    fn event_ids_are_parsed() {
        assert_eq!(
            Route::resolve(&Method::GET, "/events/42").unwrap(),
            Route::GetEvent(42)
        );
        assert!(matches!(
            Route::resolve(&Method::GET, "/events/abc"),
            Err(AppError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unknown_paths_and_methods() {
        assert!(matches!(
            Route::resolve(&Method::GET, "/nothing"),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            Route::resolve(&Method::GET, "/students/register"),
            Err(AppError::MethodNotAllowed)
        ));
        assert!(matches!(
            Route::resolve(&Method::DELETE, "/events"),
            Err(AppError::MethodNotAllowed)
        ));
    }
}
