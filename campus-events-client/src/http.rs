use std::sync::Arc;

use bytes::Bytes;
use campus_events_model::reports::{AttendanceRow, FeedbackRow, PopularityRow, StudentParticipationRow};
use campus_events_model::{
    Attendance, CheckInRequest, College, Event, EventFilter, Feedback, FeedbackRequest,
    Registration, RegistrationRequest,
};
use http::header::{ACCEPT, CONTENT_TYPE, HOST};
use http::uri::{Authority, Scheme};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt as _, Full};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::ApiError;
use crate::CampusApi;

/// Talks to the REST API over HTTP/1.1, one connection per request.
#[derive(Clone)]
pub struct HttpApi {
    authority: Authority,
    host: String,
    port: u16,
    /// Path the API is mounted under, without trailing slash.
    prefix: String,
    tls: Option<TlsConnector>,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("authority", &self.authority)
            .field("prefix", &self.prefix)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

fn tls_connector() -> TlsConnector {
    let mut root_cert_store = RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

async fn exchange<I>(io: I, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), ApiError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;
    tokio::task::spawn(async move {
        if let Err(err) = connection.await {
            debug!("connection closed: {err}");
        }
    });
    let response = sender.send_request(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, body))
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let uri: Uri = base_url
            .parse()
            .map_err(|err| ApiError::Unknown(format!("invalid base url {base_url:?}: {err}")))?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ApiError::Unknown(format!("base url {base_url:?} has no host")))?;
        let tls = match uri.scheme() {
            Some(scheme) if *scheme == Scheme::HTTPS => Some(tls_connector()),
            Some(scheme) if *scheme == Scheme::HTTP => None,
            _ => {
                return Err(ApiError::Unknown(format!(
                    "base url {base_url:?} must start with http:// or https://"
                )))
            }
        };
        let port = authority
            .port_u16()
            .unwrap_or(if tls.is_some() { 443 } else { 80 });
        Ok(Self {
            host: authority.host().to_owned(),
            authority,
            port,
            prefix: uri.path().trim_end_matches('/').to_owned(),
            tls,
        })
    }

    fn path_and_query(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{path}", self.prefix)
        } else {
            format!("{}{path}?{query}", self.prefix)
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: String,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        debug!(%method, path = path_and_query.as_str(), "api request");
        let mut builder = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header(HOST, self.authority.as_str())
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder.body(Full::new(body.map(Bytes::from).unwrap_or_default()))?;

        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (status, body) = if let Some(connector) = &self.tls {
            let server_name = ServerName::try_from(self.host.clone())
                .map_err(|err| ApiError::Network(err.to_string()))?;
            let stream = connector.connect(server_name, stream).await?;
            exchange(TokioIo::new(stream), request).await?
        } else {
            exchange(TokioIo::new(stream), request).await?
        };

        if status.is_success() {
            serde_json::from_slice(&body)
                .map_err(|err| ApiError::Unknown(format!("invalid response body: {err}")))
        } else {
            Err(ApiError::from_response(status, &body))
        }
    }

    async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let query = serde_urlencoded::to_string(query)
            .map_err(|err| ApiError::Unknown(err.to_string()))?;
        self.send(Method::GET, self.path_and_query(path, &query), None)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body).map_err(|err| ApiError::Unknown(err.to_string()))?;
        self.send(Method::POST, self.path_and_query(path, ""), Some(body))
            .await
    }
}

impl CampusApi for HttpApi {
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        self.get("/events", filter).await
    }

    async fn list_colleges(&self) -> Result<Vec<College>, ApiError> {
        self.get("/colleges", &()).await
    }

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, ApiError> {
        self.post("/students/register", &request).await
    }

    async fn check_in(&self, request: CheckInRequest) -> Result<Attendance, ApiError> {
        self.post("/attendance/checkin", &request).await
    }

    async fn submit_feedback(&self, request: FeedbackRequest) -> Result<Feedback, ApiError> {
        self.post("/feedback", &request).await
    }

    async fn event_popularity(&self) -> Result<Vec<PopularityRow>, ApiError> {
        self.get("/reports/event-popularity", &()).await
    }

    async fn attendance_report(&self) -> Result<Vec<AttendanceRow>, ApiError> {
        self.get("/reports/attendance", &()).await
    }

    async fn feedback_report(&self) -> Result<Vec<FeedbackRow>, ApiError> {
        self.get("/reports/feedback", &()).await
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<StudentParticipationRow>, ApiError> {
        self.get("/reports/top-students", &[("limit", limit)]).await
    }

    async fn upcoming_events(&self, days_ahead: i64) -> Result<Vec<Event>, ApiError> {
        self.get("/reports/upcoming-events", &[("days_ahead", days_ahead)])
            .await
    }
}
