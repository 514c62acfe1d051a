//! The three submission forms share one small state machine:
//! `Idle -> Submitting -> (Succeeded | Failed) -> Idle`.

use campus_events_client::ApiError;
use campus_events_model::{AttendanceStatus, CheckInRequest, FeedbackRequest, RegistrationRequest};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormKind {
    Registration,
    CheckIn,
    Feedback,
}

impl FormKind {
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::Registration => "Registration successful!",
            Self::CheckIn => "Check-in successful!",
            Self::Feedback => "Feedback submitted!",
        }
    }

    /// Shown when the server gave no reason.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Registration => "Failed to register",
            Self::CheckIn => "Check-in failed",
            Self::Feedback => "Submission failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum FormPhase {
    Idle,
    Submitting,
    Succeeded {
        message: String,
        until: NaiveDateTime,
    },
    Failed {
        message: String,
        until: NaiveDateTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    pub kind: FormKind,
    /// Bumped whenever the form is opened. Completions of an older
    /// generation belong to a form instance that is gone.
    pub generation: u64,
    pub phase: FormPhase,
}

impl FormState {
    #[must_use]
    pub const fn new(kind: FormKind) -> Self {
        Self {
            kind,
            generation: 0,
            phase: FormPhase::Idle,
        }
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.phase, FormPhase::Submitting)
    }

    #[must_use]
    pub fn open(self) -> Self {
        Self {
            generation: self.generation + 1,
            phase: FormPhase::Idle,
            ..self
        }
    }

    /// A second submit while one is in flight changes nothing.
    #[must_use]
    pub fn submit(self) -> Self {
        if self.is_submitting() {
            return self;
        }
        Self {
            phase: FormPhase::Submitting,
            ..self
        }
    }

    #[must_use]
    pub fn complete(
        self,
        generation: u64,
        outcome: &Result<(), ApiError>,
        now: NaiveDateTime,
        display_for: Duration,
    ) -> Self {
        if generation != self.generation || !self.is_submitting() {
            return self;
        }
        let until = now + display_for;
        let phase = match outcome {
            Ok(()) => FormPhase::Succeeded {
                message: self.kind.success_message().to_owned(),
                until,
            },
            Err(error) => FormPhase::Failed {
                message: error.user_message(self.kind.fallback_message()),
                until,
            },
        };
        Self { phase, ..self }
    }

    /// The submission was dropped before its outcome arrived, the form can be
    /// sent again.
    #[must_use]
    pub fn abandon(self, generation: u64) -> Self {
        if generation != self.generation || !self.is_submitting() {
            return self;
        }
        Self {
            phase: FormPhase::Idle,
            ..self
        }
    }

    /// Input that never reached the server.
    #[must_use]
    pub fn invalid(self, message: String, now: NaiveDateTime, display_for: Duration) -> Self {
        if self.is_submitting() {
            return self;
        }
        Self {
            phase: FormPhase::Failed {
                message,
                until: now + display_for,
            },
            ..self
        }
    }

    #[must_use]
    pub fn expire(self, now: NaiveDateTime) -> Self {
        let expired = matches!(
            &self.phase,
            FormPhase::Succeeded { until, .. } | FormPhase::Failed { until, .. } if *until <= now
        );
        if expired {
            Self {
                phase: FormPhase::Idle,
                ..self
            }
        } else {
            self
        }
    }
}

fn required_id(value: &str, what: &str) -> Result<i32, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{what} is required"));
    }
    value
        .parse()
        .map_err(|_| format!("{what} must be a number"))
}

/// Raw fields of the registration form. The event is taken from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub student_id: String,
}

impl RegistrationInput {
    pub fn request(&self, event_id: i32) -> Result<RegistrationRequest, String> {
        Ok(RegistrationRequest {
            student_id: required_id(&self.student_id, "Student ID")?,
            event_id,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInInput {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub registration_id: String,
    /// Empty lets the server derive the status from the check-in time.
    #[serde(default)]
    pub status: String,
}

impl CheckInInput {
    pub fn request(&self) -> Result<CheckInRequest, String> {
        let status = match self.status.trim() {
            "" => None,
            status => Some(
                status
                    .parse::<AttendanceStatus>()
                    .map_err(|_| format!("Unknown attendance status {status:?}"))?,
            ),
        };
        Ok(CheckInRequest {
            registration_id: required_id(&self.registration_id, "Registration ID")?,
            status,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInput {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub comment: String,
}

impl FeedbackInput {
    /// The rating is passed on as entered, range checks are the server's job.
    pub fn request(&self) -> Result<FeedbackRequest, String> {
        let comment = self.comment.trim();
        Ok(FeedbackRequest {
            student_id: required_id(&self.student_id, "Student ID")?,
            event_id: required_id(&self.event_id, "Event ID")?,
            rating: required_id(&self.rating, "Rating")?,
            comment: (!comment.is_empty()).then(|| comment.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(seconds: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 6)
            .and_then(|date| date.and_hms_opt(12, 0, seconds))
            .unwrap()
    }

    #[test]
    fn success_shows_the_message_until_it_expires() {
        let form = FormState::new(FormKind::CheckIn).open().submit();
        let form = form.complete(1, &Ok(()), at(0), Duration::seconds(3));
        assert_eq!(
            form.phase,
            FormPhase::Succeeded {
                message: "Check-in successful!".to_owned(),
                until: at(3)
            }
        );
        assert_eq!(form.clone().expire(at(2)), form);
        assert_eq!(form.expire(at(3)).phase, FormPhase::Idle);
    }

    #[test]
    fn second_submit_is_ignored_while_in_flight() {
        let form = FormState::new(FormKind::Registration).open().submit();
        assert_eq!(form.clone().submit(), form);
        assert_eq!(
            form.clone()
                .invalid("Student ID is required".to_owned(), at(0), Duration::seconds(3)),
            form
        );
    }

    #[test]
    fn abandoned_submissions_can_be_retried() {
        let form = FormState::new(FormKind::Registration).open().submit();
        let abandoned = form.clone().abandon(form.generation);
        assert_eq!(abandoned.phase, FormPhase::Idle);
        assert!(abandoned.clone().submit().is_submitting());

        let done = form.complete(1, &Ok(()), at(0), Duration::seconds(3));
        assert_eq!(done.clone().abandon(1), done);
    }

    #[test]
    fn stale_completions_are_discarded() {
        let form = FormState::new(FormKind::Feedback).open().submit();
        let reopened = form.open();
        assert_eq!(reopened.generation, 2);
        let after = reopened
            .clone()
            .complete(1, &Ok(()), at(0), Duration::seconds(3));
        assert_eq!(after, reopened);
    }

    #[test]
    fn failures_prefer_the_server_detail() {
        let form = FormState::new(FormKind::Registration).open().submit();
        let failed = form.clone().complete(
            1,
            &Err(ApiError::from(campus_events_model::Rejection::CapacityExceeded)),
            at(0),
            Duration::seconds(3),
        );
        assert!(matches!(
            failed.phase,
            FormPhase::Failed { ref message, .. } if message == "Event is at full capacity"
        ));
        let failed = form.complete(
            1,
            &Err(ApiError::Network("connection reset".to_owned())),
            at(0),
            Duration::seconds(3),
        );
        assert!(matches!(
            failed.phase,
            FormPhase::Failed { ref message, .. } if message == "Failed to register"
        ));
    }

    #[test]
    fn inputs_are_parsed() {
        let input = RegistrationInput {
            csrf_token: String::new(),
            student_id: " 7 ".to_owned(),
        };
        assert_eq!(
            input.request(3),
            Ok(RegistrationRequest {
                student_id: 7,
                event_id: 3
            })
        );
        let input = RegistrationInput::default();
        assert_eq!(input.request(3), Err("Student ID is required".to_owned()));

        let input = CheckInInput {
            registration_id: "12".to_owned(),
            status: "late".to_owned(),
            ..CheckInInput::default()
        };
        assert_eq!(
            input.request().unwrap().status,
            Some(AttendanceStatus::Late)
        );

        let input = FeedbackInput {
            student_id: "1".to_owned(),
            event_id: "5".to_owned(),
            rating: "6".to_owned(),
            comment: "  ".to_owned(),
            ..FeedbackInput::default()
        };
        let request = input.request().unwrap();
        assert_eq!(request.rating, 6);
        assert_eq!(request.comment, None);
    }
}
