use campus_events_client::{ApiError, CampusApi};
use campus_events_model::reports::{
    AttendanceRow, FeedbackRow, PopularityRow, StudentParticipationRow, DEFAULT_DAYS_AHEAD,
};
use campus_events_model::{percentage, Event};
use serde::{Deserialize, Serialize};

pub const TOP_STUDENTS_LIMIT: i64 = 5;
/// Rows shown per table.
pub const SLICE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub popularity: Vec<PopularityRow>,
    pub attendance: Vec<AttendanceRow>,
    pub feedback: Vec<FeedbackRow>,
    pub top_students: Vec<StudentParticipationRow>,
    pub upcoming: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub generation: u64,
    pub loading: bool,
    pub data: Option<DashboardData>,
    pub error: Option<String>,
}

impl DashboardState {
    #[must_use]
    pub fn load(self) -> Self {
        Self {
            generation: self.generation + 1,
            loading: true,
            ..self
        }
    }

    /// A failed reload keeps the reports that are already on screen.
    #[must_use]
    pub fn loaded(self, generation: u64, result: Result<DashboardData, ApiError>) -> Self {
        if generation != self.generation {
            return self;
        }
        match result {
            Ok(data) => Self {
                loading: false,
                data: Some(data),
                error: None,
                ..self
            },
            Err(error) => Self {
                loading: false,
                error: Some(error.user_message("Failed to load reports")),
                ..self
            },
        }
    }
}

/// All five reports, requested concurrently. The first failure wins.
pub async fn fetch<A: CampusApi>(api: &A) -> Result<DashboardData, ApiError> {
    let (popularity, attendance, feedback, top_students, upcoming) = tokio::try_join!(
        api.event_popularity(),
        api.attendance_report(),
        api.feedback_report(),
        api.top_students(TOP_STUDENTS_LIMIT),
        api.upcoming_events(DEFAULT_DAYS_AHEAD),
    )?;
    Ok(DashboardData {
        popularity,
        attendance,
        feedback,
        top_students,
        upcoming,
    })
}

/// One table row with a bar of `percent` width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRow {
    pub label: String,
    pub value: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub popularity: Vec<BarRow>,
    pub attendance: Vec<BarRow>,
    pub feedback: Vec<BarRow>,
    pub top_students: Vec<BarRow>,
    pub upcoming: Vec<BarRow>,
}

impl DashboardView {
    #[must_use]
    pub fn new(data: &DashboardData) -> Self {
        let most_registrations = data
            .popularity
            .iter()
            .map(|row| i64::from(row.registrations))
            .max()
            .unwrap_or(0);
        let most_attended = data
            .top_students
            .iter()
            .map(|row| row.events_attended)
            .max()
            .unwrap_or(0);
        Self {
            popularity: data
                .popularity
                .iter()
                .take(SLICE)
                .map(|row| BarRow {
                    label: row.title.clone(),
                    value: row.registrations.to_string(),
                    percent: percentage(row.registrations.into(), most_registrations),
                })
                .collect(),
            attendance: data
                .attendance
                .iter()
                .take(SLICE)
                .map(|row| BarRow {
                    label: row.title.clone(),
                    value: format!(
                        "{}/{} ({}%)",
                        row.attended, row.registered, row.attendance_percentage
                    ),
                    percent: row.attendance_percentage.clamp(0.0, 100.0),
                })
                .collect(),
            feedback: data
                .feedback
                .iter()
                .take(SLICE)
                .map(|row| BarRow {
                    label: row.title.clone(),
                    value: format!("{:.2} ({} reviews)", row.average_rating, row.feedback_count),
                    percent: campus_events_model::round2(row.average_rating / 5.0 * 100.0),
                })
                .collect(),
            top_students: data
                .top_students
                .iter()
                .take(SLICE)
                .map(|row| BarRow {
                    label: row.name.clone(),
                    value: row.events_attended.to_string(),
                    percent: percentage(row.events_attended, most_attended),
                })
                .collect(),
            upcoming: data
                .upcoming
                .iter()
                .take(SLICE)
                .map(|event| BarRow {
                    label: event.title.clone(),
                    value: event.date.format("%Y-%m-%d %H:%M").to_string(),
                    percent: percentage(event.registrations_count.into(), event.capacity.into()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use campus_events_client::{Deadline, MemoryApi};

    use super::*;

    #[tokio::test]
    async fn all_reports_are_loaded() {
        let api = MemoryApi::seeded();
        let state = DashboardState::default().load();
        let generation = state.generation;
        let state = state.loaded(generation, fetch(&api).await);
        let data = state.data.unwrap();
        assert_eq!(data.top_students.len(), 5);
        assert_eq!(data.upcoming.len(), 4);

        let view = DashboardView::new(&data);
        assert_eq!(view.popularity[0].label, "Sports Day");
        assert!((view.popularity[0].percent - 100.0).abs() < f64::EPSILON);
        assert!(view.popularity.len() <= SLICE);
    }

    #[tokio::test]
    async fn failures_keep_previous_reports() {
        let api = MemoryApi::seeded();
        let state = DashboardState::default().load();
        let state = state.loaded(1, fetch(&api).await);
        assert!(state.data.is_some());

        let slow = Deadline::new(
            api.with_latency(Duration::from_millis(200)),
            Duration::from_millis(10),
        );
        let state = state.load();
        let state = state.loaded(2, fetch(&slow).await);
        assert!(state.data.is_some());
        assert_eq!(state.error.as_deref(), Some("Request timed out"));
        assert!(!state.loading);
    }
}
