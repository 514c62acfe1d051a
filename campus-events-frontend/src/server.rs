//! Routing, per-session state and the hyper accept loop of the front end.

use core::future::Future;
use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use campus_events_client::{ApiError, CampusApi};
use campus_events_config::Config;
use campus_events_model::{Event, EventFilter, EventStatus, EventType};
use campus_events_server::{serve, shutdown_signal};
use chrono::{NaiveDateTime, Utc};
use headers::{CacheControl, ContentType, ETag, HeaderMapExt as _, IfNoneMatch};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt as _, Full, Limited};
use hyper::body::Incoming;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::FrontendError;
use crate::forms::{CheckInInput, FeedbackInput, FormKind, FormPhase, RegistrationInput};
use crate::render::{self, Refresh, INDEX_CSS};
use crate::session::{ResponseSessionExt as _, Session};
use crate::state::{reduce, Action, AppState, Timings, View};
use crate::{dashboard, directory};

const MAX_FORM_SIZE: usize = 16 * 1024;
/// Sessions beyond this are evicted, least recently seen first.
const MAX_SESSIONS: usize = 10_000;

static INDEX_CSS_ETAG: Lazy<Option<ETag>> = Lazy::new(|| {
    format!("\"{}-{}\"", env!("CARGO_PKG_VERSION"), INDEX_CSS.len())
        .parse()
        .ok()
});

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Filter controls of the event list as they appear in the query string.
/// An absent `status` means active events, an empty one means any status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    college_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl FilterQuery {
    pub fn parse(query: Option<&str>) -> Result<Self, FrontendError> {
        Ok(query
            .map(serde_urlencoded::from_str)
            .transpose()?
            .unwrap_or_default())
    }

    pub fn filter(&self) -> Result<EventFilter, FrontendError> {
        let college_id = non_empty(self.college_id.as_ref())
            .map(|value| {
                value.parse().map_err(|_| FrontendError::InvalidParameter {
                    name: "college_id",
                    value: value.to_owned(),
                })
            })
            .transpose()?;
        let status = match &self.status {
            None => Some(EventStatus::Active),
            Some(status) => non_empty(Some(status))
                .map(|value| {
                    value
                        .parse::<EventStatus>()
                        .map_err(|_| FrontendError::InvalidParameter {
                            name: "status",
                            value: value.to_owned(),
                        })
                })
                .transpose()?,
        };
        Ok(EventFilter {
            event_type: non_empty(self.event_type.as_ref()).map(EventType::from),
            college_id,
            status,
        })
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(self).unwrap_or_default()
    }
}

impl From<&EventFilter> for FilterQuery {
    fn from(filter: &EventFilter) -> Self {
        Self {
            event_type: filter
                .event_type
                .as_ref()
                .map(|event_type| event_type.as_str().to_owned()),
            college_id: filter.college_id.map(|college_id| college_id.to_string()),
            status: Some(
                filter
                    .status
                    .map_or_else(String::new, |status| status.as_str().to_owned()),
            ),
        }
    }
}

/// Every page of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Events,
    RegisterForm(i32),
    Register(i32),
    CheckInForm,
    CheckIn,
    FeedbackForm,
    Feedback,
    Dashboard,
    Stylesheet,
}

impl Page {
    /// Trailing slashes are ignored, `/checkin/` is the same as `/checkin`.
    pub fn resolve(method: &Method, path: &str) -> Result<Self, FrontendError> {
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        let (get, post) = match segments.as_slice() {
            [] => (Some(Self::Events), None),
            ["register", id] => {
                let id = id.parse().map_err(|_| FrontendError::InvalidParameter {
                    name: "event id",
                    value: (*id).to_owned(),
                })?;
                (Some(Self::RegisterForm(id)), Some(Self::Register(id)))
            }
            ["checkin"] => (Some(Self::CheckInForm), Some(Self::CheckIn)),
            ["feedback"] => (Some(Self::FeedbackForm), Some(Self::Feedback)),
            ["dashboard"] => (Some(Self::Dashboard), None),
            ["index.css"] => (Some(Self::Stylesheet), None),
            _ => return Err(FrontendError::NotFound),
        };
        let page = match *method {
            Method::GET | Method::HEAD => get,
            Method::POST => post,
            _ => None,
        };
        page.ok_or(FrontendError::MethodNotAllowed)
    }
}

struct Entry {
    state: AppState,
    last_seen: Instant,
}

/// [`AppState`] of every browser session, keyed by session token.
pub struct SessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    timings: Timings,
}

impl SessionStore {
    #[must_use]
    pub fn new(timings: Timings) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            timings,
        }
    }

    fn with_entry<T>(&self, token: &str, f: impl FnOnce(&mut AppState) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(token) && entries.len() >= MAX_SESSIONS {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(token, _)| token.clone());
            if let Some(oldest) = oldest {
                debug!("evicting least recently used session");
                entries.remove(&oldest);
            }
        }
        let entry = entries.entry(token.to_owned()).or_insert_with(|| Entry {
            state: AppState::new(self.timings),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        f(&mut entry.state)
    }

    /// Runs `actions` through [`reduce`] and returns the resulting state.
    pub fn apply(&self, token: &str, actions: impl IntoIterator<Item = Action>) -> AppState {
        self.with_entry(token, |state| {
            for action in actions {
                *state = reduce(state.clone(), action);
            }
            state.clone()
        })
    }

    /// Moves the form into `Submitting` and returns the generation the
    /// completion has to carry. `None` while a submission is still in flight.
    pub fn begin_submit(&self, token: &str, kind: FormKind) -> Option<u64> {
        self.with_entry(token, |state| {
            if state.form(kind).is_submitting() {
                return None;
            }
            *state = reduce(state.clone(), Action::Submit(kind));
            Some(state.form(kind).generation)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns a form to `Idle` when the request driving its submission is
/// dropped, e.g. because the browser disconnected.
struct PendingSubmit<'a> {
    sessions: &'a SessionStore,
    token: &'a str,
    kind: FormKind,
    generation: u64,
    settled: bool,
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        debug!(kind = ?self.kind, "submission dropped before it completed");
        self.sessions.apply(
            self.token,
            [Action::Abandoned {
                form: self.kind,
                generation: self.generation,
            }],
        );
    }
}

fn html(
    session: &Session,
    status: StatusCode,
    body: String,
) -> Result<Response<Full<Bytes>>, FrontendError> {
    let mut response = Response::builder()
        .status(status)
        .with_session(session)
        .body(Full::new(Bytes::from(body)))?;
    response.headers_mut().typed_insert(ContentType::html());
    Ok(response)
}

pub async fn read_form<T, B>(body: B) -> Result<T, FrontendError>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_FORM_SIZE)
        .collect()
        .await
        .map_err(|error| FrontendError::Body(error.to_string()))?
        .to_bytes();
    Ok(serde_urlencoded::from_bytes(&bytes)?)
}

pub struct Frontend<A> {
    api: A,
    sessions: SessionStore,
    timings: Timings,
}

impl<A: CampusApi + 'static> Frontend<A> {
    pub fn new(api: A, timings: Timings) -> Self {
        Self {
            api,
            sessions: SessionStore::new(timings),
            timings,
        }
    }

    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!(method = %request.method(), uri = %request.uri(), "request");
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(frontend_error) => error_response(&frontend_error),
        }
    }

    async fn dispatch<B>(&self, request: Request<B>) -> Result<Response<Full<Bytes>>, FrontendError>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let page = Page::resolve(request.method(), request.uri().path())?;
        let session = Session::new(&request);
        match page {
            Page::Stylesheet => stylesheet(request.headers().typed_get()),
            Page::Events => self.events(&session, request.uri().query()).await,
            Page::RegisterForm(event_id) => self.register_form(&session, event_id).await,
            Page::Register(event_id) => {
                self.register(&session, event_id, read_form(request.into_body()).await?)
                    .await
            }
            Page::CheckInForm => self.check_in_form(&session),
            Page::CheckIn => {
                self.check_in(&session, read_form(request.into_body()).await?)
                    .await
            }
            Page::FeedbackForm => self.feedback_form(&session),
            Page::Feedback => {
                self.feedback(&session, read_form(request.into_body()).await?)
                    .await
            }
            Page::Dashboard => self.dashboard(&session).await,
        }
    }

    async fn events(
        &self,
        session: &Session,
        query: Option<&str>,
    ) -> Result<Response<Full<Bytes>>, FrontendError> {
        let filter = FilterQuery::parse(query)?.filter()?;
        let state = self.sessions.apply(
            session.token(),
            [
                Action::Navigate(View::Events),
                Action::Expire(now()),
                Action::QueryEvents(filter.clone()),
            ],
        );
        let generation = state.directory.generation;
        let result = directory::fetch(&self.api, &filter).await;
        let state = self
            .sessions
            .apply(session.token(), [Action::EventsLoaded { generation, result }]);
        html(session, StatusCode::OK, render::events_page(&state)?)
    }

    /// The current numbers of one event, independent of the listed filter.
    async fn find_event(&self, event_id: i32) -> Result<Event, FrontendError> {
        self.api
            .list_events(&EventFilter::default())
            .await?
            .into_iter()
            .find(|event| event.id == event_id)
            .ok_or(FrontendError::NotFound)
    }

    async fn register_form(
        &self,
        session: &Session,
        event_id: i32,
    ) -> Result<Response<Full<Bytes>>, FrontendError> {
        let event = self.find_event(event_id).await?;
        let state = self.sessions.apply(
            session.token(),
            [
                Action::Navigate(View::Register { event_id }),
                Action::Expire(now()),
                Action::OpenForm(FormKind::Registration),
            ],
        );
        let body = render::register_page(
            &state,
            session.token(),
            event_id,
            Some(&event),
            &RegistrationInput::default(),
            None,
        )?;
        html(session, StatusCode::OK, body)
    }

    async fn register(
        &self,
        session: &Session,
        event_id: i32,
        input: RegistrationInput,
    ) -> Result<Response<Full<Bytes>>, FrontendError> {
        session.verify(&input.csrf_token)?;
        let view = View::Register { event_id };
        let state = self
            .submit(session, view, FormKind::Registration, input.request(event_id), |request| async move {
                self.api.register(request).await.map(|_| ())
            })
            .await;
        // the outcome is already in the form, a failed lookup only costs the event card
        let fresh = match self.find_event(event_id).await {
            Ok(event) => Some(event),
            Err(lookup_error) => {
                debug!(event_id, "event lookup after submission failed: {lookup_error}");
                None
            }
        };
        let event = fresh.as_ref().or_else(|| state.directory.event(event_id));
        let refresh = self.refresh(&state, FormKind::Registration, &format!("/register/{event_id}"));
        let body = render::register_page(
            &state,
            session.token(),
            event_id,
            event,
            &input,
            refresh.as_ref(),
        )?;
        html(session, StatusCode::OK, body)
    }

    fn check_in_form(&self, session: &Session) -> Result<Response<Full<Bytes>>, FrontendError> {
        let state = self.sessions.apply(
            session.token(),
            [
                Action::Navigate(View::CheckIn),
                Action::Expire(now()),
                Action::OpenForm(FormKind::CheckIn),
            ],
        );
        let body = render::check_in_page(&state, session.token(), &CheckInInput::default(), None)?;
        html(session, StatusCode::OK, body)
    }

    async fn check_in(
        &self,
        session: &Session,
        input: CheckInInput,
    ) -> Result<Response<Full<Bytes>>, FrontendError> {
        session.verify(&input.csrf_token)?;
        let state = self
            .submit(session, View::CheckIn, FormKind::CheckIn, input.request(), |request| async move {
                self.api.check_in(request).await.map(|_| ())
            })
            .await;
        let refresh = self.refresh(&state, FormKind::CheckIn, "/checkin");
        let body = render::check_in_page(&state, session.token(), &input, refresh.as_ref())?;
        html(session, StatusCode::OK, body)
    }

    fn feedback_form(&self, session: &Session) -> Result<Response<Full<Bytes>>, FrontendError> {
        let state = self.sessions.apply(
            session.token(),
            [
                Action::Navigate(View::Feedback),
                Action::Expire(now()),
                Action::OpenForm(FormKind::Feedback),
            ],
        );
        let body = render::feedback_page(&state, session.token(), &FeedbackInput::default(), None)?;
        html(session, StatusCode::OK, body)
    }

    async fn feedback(
        &self,
        session: &Session,
        input: FeedbackInput,
    ) -> Result<Response<Full<Bytes>>, FrontendError> {
        session.verify(&input.csrf_token)?;
        let state = self
            .submit(session, View::Feedback, FormKind::Feedback, input.request(), |request| async move {
                self.api.submit_feedback(request).await.map(|_| ())
            })
            .await;
        let refresh = self.refresh(&state, FormKind::Feedback, "/feedback");
        let body = render::feedback_page(&state, session.token(), &input, refresh.as_ref())?;
        html(session, StatusCode::OK, body)
    }

    async fn dashboard(&self, session: &Session) -> Result<Response<Full<Bytes>>, FrontendError> {
        let state = self.sessions.apply(
            session.token(),
            [Action::Navigate(View::Dashboard), Action::LoadDashboard],
        );
        let generation = state.dashboard.generation;
        let result = dashboard::fetch(&self.api).await;
        let state = self
            .sessions
            .apply(session.token(), [Action::DashboardLoaded { generation, result }]);
        html(session, StatusCode::OK, render::dashboard_page(&state)?)
    }

    /// Drives one form through `Submitting` to its outcome. Input that does not
    /// parse never reaches the API.
    async fn submit<T, F, Fut>(
        &self,
        session: &Session,
        view: View,
        kind: FormKind,
        request: Result<T, String>,
        send: F,
    ) -> AppState
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let token = session.token();
        let started = now();
        let state = self
            .sessions
            .apply(token, [Action::Navigate(view), Action::Expire(started)]);
        let request = match request {
            Ok(request) => request,
            Err(message) => {
                return self.sessions.apply(
                    token,
                    [Action::Invalid {
                        form: kind,
                        message,
                        now: started,
                    }],
                );
            }
        };
        let Some(generation) = self.sessions.begin_submit(token, kind) else {
            debug!(?kind, "submission already in flight");
            return state;
        };
        let mut pending = PendingSubmit {
            sessions: &self.sessions,
            token,
            kind,
            generation,
            settled: false,
        };
        let outcome = send(request).await;
        pending.settled = true;
        if let Err(error) = &outcome {
            info!(?kind, "submission failed: {error}");
        }
        self.sessions.apply(
            token,
            [Action::Completed {
                form: kind,
                generation,
                outcome,
                now: now(),
            }],
        )
    }

    /// A successful registration returns to the event list, every other
    /// message is cleared by reloading the form.
    fn refresh(&self, state: &AppState, kind: FormKind, form_url: &str) -> Option<Refresh> {
        match state.form(kind).phase {
            FormPhase::Succeeded { .. } if kind == FormKind::Registration => {
                Some(Refresh::after_millis(self.timings.redirect_delay_ms, "/"))
            }
            FormPhase::Succeeded { .. } | FormPhase::Failed { .. } => Some(
                Refresh::after_millis(self.timings.message_duration_ms, form_url),
            ),
            FormPhase::Idle | FormPhase::Submitting => None,
        }
    }
}

fn stylesheet(if_none_match: Option<IfNoneMatch>) -> Result<Response<Full<Bytes>>, FrontendError> {
    let etag = INDEX_CSS_ETAG.clone();
    let unchanged = match (&if_none_match, &etag) {
        (Some(if_none_match), Some(etag)) => !if_none_match.precondition_passes(etag),
        _ => false,
    };
    if unchanged {
        return Ok(Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .body(Full::new(Bytes::new()))?);
    }
    let mut response = Response::new(Full::new(Bytes::from_static(INDEX_CSS.as_bytes())));
    let headers = response.headers_mut();
    headers.typed_insert(ContentType::from(mime::TEXT_CSS_UTF_8));
    headers.typed_insert(
        CacheControl::new()
            .with_public()
            .with_max_age(Duration::from_secs(60 * 60)),
    );
    if let Some(etag) = etag {
        headers.typed_insert(etag);
    }
    Ok(response)
}

pub fn error_response(frontend_error: &FrontendError) -> Response<Full<Bytes>> {
    frontend_error.log();
    let status = frontend_error.status();
    let message = frontend_error.message();
    let body = render::error_page(status, &message).unwrap_or_else(|render_error| {
        error!("failed to render error page: {render_error}");
        format!("{} {message}", status.as_u16())
    });
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().typed_insert(ContentType::html());
    response
}

pub async fn setup_server<A: CampusApi + 'static>(
    config: &Config,
    api: A,
) -> Result<(Arc<Frontend<A>>, TcpListener), FrontendError> {
    info!("starting up front end...");

    render::handlebars()?;
    let listener = TcpListener::bind(config.frontend.listen).await?;

    Ok((
        Arc::new(Frontend::new(api, Timings::from(&config.ui))),
        listener,
    ))
}

pub async fn run_server<A: CampusApi + 'static>(
    config: &Config,
    api: A,
) -> Result<impl Future<Output = Result<(), FrontendError>>, FrontendError> {
    let (frontend, listener) = setup_server(config, api).await?;

    info!("listening on {}", listener.local_addr()?);

    Ok(async move {
        let handler = move |request: Request<Incoming>| {
            let frontend = Arc::clone(&frontend);
            async move { frontend.handle(request).await }
        };
        serve(listener, handler, shutdown_signal()).await;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_status_lists_active_events() {
        let filter = FilterQuery::parse(None).unwrap().filter().unwrap();
        assert_eq!(filter, EventFilter::active());

        let filter = FilterQuery::parse(Some("status=&event_type=Workshop"))
            .unwrap()
            .filter()
            .unwrap();
        assert_eq!(filter.status, None);
        assert_eq!(filter.event_type, Some(EventType::Workshop));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            FilterQuery::parse(Some("college_id=abc")).unwrap().filter(),
            Err(FrontendError::InvalidParameter { name: "college_id", .. })
        ));
    }

    #[test]
    fn retry_links_repeat_the_filter() {
        let filter = EventFilter {
            college_id: Some(2),
            ..EventFilter::default()
        };
        let query = FilterQuery::from(&filter).to_query_string();
        assert_eq!(query, "college_id=2&status=");
        let parsed = FilterQuery::parse(Some(&query)).unwrap().filter().unwrap();
        assert_eq!(parsed, filter);
    }

    #[test]
    fn pages() {
        assert_eq!(Page::resolve(&Method::GET, "/").unwrap(), Page::Events);
        assert_eq!(
            Page::resolve(&Method::POST, "/register/3/").unwrap(),
            Page::Register(3)
        );
        assert_eq!(
            Page::resolve(&Method::GET, "/checkin/").unwrap(),
            Page::CheckInForm
        );
        assert!(matches!(
            Page::resolve(&Method::POST, "/dashboard"),
            Err(FrontendError::MethodNotAllowed)
        ));
        assert!(matches!(
            Page::resolve(&Method::GET, "/register/abc"),
            Err(FrontendError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Page::resolve(&Method::GET, "/admin"),
            Err(FrontendError::NotFound)
        ));
    }

    #[test]
    fn second_submit_waits_for_the_first() {
        let sessions = SessionStore::new(Timings {
            redirect_delay_ms: 1200,
            message_duration_ms: 3000,
        });
        sessions.apply("token", [Action::OpenForm(FormKind::CheckIn)]);
        assert_eq!(sessions.begin_submit("token", FormKind::CheckIn), Some(1));
        assert_eq!(sessions.begin_submit("token", FormKind::CheckIn), None);
        assert_eq!(sessions.begin_submit("other", FormKind::CheckIn), Some(0));
        assert_eq!(sessions.len(), 2);
    }
}
