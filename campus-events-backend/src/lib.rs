//! REST API of the campus events platform, served with hyper on top of the
//! PostgreSQL backed [`campus_events_database`].

pub mod error;
pub mod router;
pub mod routes;

use core::future::Future;

use bytes::Bytes;
use campus_events_config::Config;
use campus_events_database::{get_database_connection, Pool};
use campus_events_server::{serve, shutdown_signal};
use error::AppError;
use headers::{ContentType, HeaderMapExt as _};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use router::Route;
use routes::{events, people, read_json, registration, reports, ApiQuery};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    /// Only checked-in students may leave feedback.
    pub require_attendance: bool,
}

pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response.headers_mut().typed_insert(ContentType::json());
            response
        }
        Err(err) => {
            error!("failed to serialize response: {err}");
            let mut response = Response::new(Full::new(Bytes::from_static(
                br#"{"detail":"Internal Server Error"}"#,
            )));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response.headers_mut().typed_insert(ContentType::json());
            response
        }
    }
}

async fn dispatch(state: &AppState, request: Request<Incoming>) -> Result<Response<Full<Bytes>>, AppError> {
    let route = Route::resolve(request.method(), request.uri().path())?;
    let query = ApiQuery::parse(request.uri().query())?;
    match route {
        Route::ListEvents => events::list(state, &query).await,
        Route::CreateEvent => events::create(state, read_json(request.into_body()).await?).await,
        Route::GetEvent(event_id) => events::get(state, event_id).await,
        Route::ListColleges => people::colleges(state).await,
        Route::ListStudents => people::students(state, &query).await,
        Route::ListEventManagers => people::event_managers(state).await,
        Route::Register => {
            registration::register(state, read_json(request.into_body()).await?).await
        }
        Route::CheckIn => registration::check_in(state, read_json(request.into_body()).await?).await,
        Route::SubmitFeedback => {
            registration::feedback(state, read_json(request.into_body()).await?).await
        }
        Route::EventPopularity => reports::event_popularity(state, &query).await,
        Route::AttendanceReport => reports::attendance(state, &query).await,
        Route::FeedbackReport => reports::feedback(state, &query).await,
        Route::StudentParticipation => reports::student_participation(state, &query).await,
        Route::TopStudents => reports::top_students(state, &query).await,
        Route::UpcomingEvents => reports::upcoming_events(state, &query).await,
    }
}

pub async fn handle(state: AppState, request: Request<Incoming>) -> Response<Full<Bytes>> {
    debug!(method = %request.method(), uri = %request.uri(), "request");
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(app_error) => app_error.into_response(),
    }
}

pub async fn setup_server(config: &Config) -> Result<(AppState, TcpListener), AppError> {
    info!("starting up server...");

    let pool = get_database_connection(config.database_url()?)?;
    let listener = TcpListener::bind(config.backend.listen).await?;

    Ok((
        AppState {
            pool,
            require_attendance: config.feedback.require_attendance,
        },
        listener,
    ))
}

pub async fn run_server(
    config: &Config,
) -> Result<impl Future<Output = Result<(), AppError>>, AppError> {
    let (state, listener) = setup_server(config).await?;

    info!("listening on {}", listener.local_addr()?);

    Ok(async move {
        let handler = move |request: Request<Incoming>| handle(state.clone(), request);
        serve(listener, handler, shutdown_signal()).await;
        Ok(())
    })
}
