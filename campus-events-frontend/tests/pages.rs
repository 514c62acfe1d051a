use std::time::Duration;

use bytes::Bytes;
use campus_events_client::{CampusApi, Deadline, MemoryApi};
use campus_events_frontend::state::Timings;
use campus_events_frontend::Frontend;
use http::header::{CONTENT_TYPE, COOKIE, ETAG, IF_NONE_MATCH, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt as _, Full};

const TIMINGS: Timings = Timings {
    redirect_delay_ms: 1200,
    message_duration_ms: 3000,
};

struct Page {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

async fn send<A: CampusApi + 'static>(frontend: &Frontend<A>, request: Request<Full<Bytes>>) -> Page {
    let response = frontend.handle(request).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Page {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

fn get(path: &str, token: Option<&str>) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(token) = token {
        builder = builder.header(COOKIE, format!("campus_events_session={token}"));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

fn post(path: &str, token: &str, form: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(COOKIE, format!("campus_events_session={token}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::from(form.to_owned())))
        .unwrap()
}

/// Opens the event list and returns the session token it handed out.
async fn start_session<A: CampusApi + 'static>(frontend: &Frontend<A>) -> String {
    let page = send(frontend, get("/", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    let cookie = page.headers[SET_COOKIE].to_str().unwrap();
    let pair = cookie.split(';').next().unwrap();
    let (name, token) = pair.split_once('=').unwrap();
    assert_eq!(name, "campus_events_session");
    token.to_owned()
}

fn registrations_count(api: &MemoryApi, event_id: i32) -> i32 {
    api.store()
        .events
        .iter()
        .find(|event| event.id == event_id)
        .map(|event| event.registrations_count)
        .unwrap()
}

#[tokio::test]
async fn event_list_shows_active_events_with_capacity() {
    let api = MemoryApi::seeded();
    let frontend = Frontend::new(api, TIMINGS);
    let page = send(&frontend, get("/", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.headers.contains_key(SET_COOKIE));
    assert!(page.body.contains("AI Workshop"));
    assert!(page.body.contains("35/50"));
    assert!(page.body.contains(r#"href="/register/1""#));

    let page = send(&frontend, get("/?event_type=Sports&status=", None)).await;
    assert!(page.body.contains("Sports Day"));
    assert!(!page.body.contains("AI Workshop"));
}

#[tokio::test]
async fn registration_success_redirects_to_the_list() {
    let api = MemoryApi::seeded();
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;

    let form = send(&frontend, get("/register/1", Some(&token))).await;
    assert!(form.body.contains("AI Workshop"));
    assert!(form.body.contains(&format!(r#"value="{token}""#)));

    let page = send(
        &frontend,
        post("/register/1", &token, &format!("csrf_token={token}&student_id=3")),
    )
    .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Registration successful!"));
    assert!(page.body.contains(r#"content="1.2;url=/""#));
    assert_eq!(registrations_count(&api, 1), 36);

    let list = send(&frontend, get("/", Some(&token))).await;
    assert!(list.body.contains("36/50"));
    assert!(!list.headers.contains_key(SET_COOKIE));
}

#[tokio::test]
async fn full_events_report_the_capacity_rule() {
    let api = MemoryApi::seeded();
    api.store().events[0].registrations_count = 50;
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;

    let page = send(
        &frontend,
        post("/register/1", &token, &format!("csrf_token={token}&student_id=3")),
    )
    .await;
    assert!(page.body.contains("Event is at full capacity"));
    assert!(page.body.contains(r#"content="3.0;url=/register/1""#));
    assert_eq!(registrations_count(&api, 1), 50);

    let list = send(&frontend, get("/", Some(&token))).await;
    assert!(list.body.contains("50/50"));
    assert!(!list.body.contains(r#"href="/register/1""#));
}

#[tokio::test]
async fn missing_student_id_never_reaches_the_api() {
    let api = MemoryApi::seeded();
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;

    let page = send(
        &frontend,
        post("/register/1", &token, &format!("csrf_token={token}&student_id=")),
    )
    .await;
    assert!(page.body.contains("Student ID is required"));
    assert_eq!(registrations_count(&api, 1), 35);
}

#[tokio::test]
async fn slow_backend_fails_inside_the_registration_form() {
    let api = MemoryApi::seeded().with_latency(Duration::from_millis(200));
    let frontend = Frontend::new(Deadline::new(api.clone(), Duration::from_millis(20)), TIMINGS);
    let token = start_session(&frontend).await;

    let page = send(
        &frontend,
        post("/register/1", &token, &format!("csrf_token={token}&student_id=3")),
    )
    .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(r#"action="/register/1""#));
    assert!(page.body.contains("Request timed out"));
    assert!(page.body.contains(r#"content="3.0;url=/register/1""#));
    assert_eq!(registrations_count(&api, 1), 35);
}

#[tokio::test]
async fn dropped_submission_can_be_sent_again() {
    let api = MemoryApi::seeded().with_latency(Duration::from_millis(50));
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;
    let form = format!("csrf_token={token}&student_id=3");

    let dropped = tokio::time::timeout(
        Duration::from_millis(10),
        send(&frontend, post("/register/1", &token, &form)),
    )
    .await;
    assert!(dropped.is_err());
    assert_eq!(registrations_count(&api, 1), 35);

    let page = send(&frontend, post("/register/1", &token, &form)).await;
    assert!(page.body.contains("Registration successful!"));
    assert!(!page.body.contains("disabled"));
    assert_eq!(registrations_count(&api, 1), 36);
}

#[tokio::test]
async fn forged_form_posts_are_rejected() {
    let api = MemoryApi::seeded();
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;

    let page = send(
        &frontend,
        post("/register/1", &token, "csrf_token=forged&student_id=3"),
    )
    .await;
    assert_eq!(page.status, StatusCode::FORBIDDEN);
    assert_eq!(registrations_count(&api, 1), 35);
}

#[tokio::test]
async fn check_in_and_feedback_forms_submit() {
    let api = MemoryApi::seeded();
    let frontend = Frontend::new(api.clone(), TIMINGS);
    let token = start_session(&frontend).await;

    let page = send(
        &frontend,
        post(
            "/checkin",
            &token,
            &format!("csrf_token={token}&registration_id=1&status=present"),
        ),
    )
    .await;
    assert!(page.body.contains("Check-in successful!"));
    assert!(page.body.contains(r#"content="3.0;url=/checkin""#));

    let page = send(
        &frontend,
        post(
            "/feedback",
            &token,
            &format!("csrf_token={token}&student_id=1&event_id=1&rating=6&comment="),
        ),
    )
    .await;
    assert!(!page.body.contains("Feedback submitted!"));
    assert!(page.body.contains("error-message"));
    assert!(api.store().feedback.iter().all(|feedback| feedback.event_id != 1));

    let page = send(
        &frontend,
        post(
            "/feedback",
            &token,
            &format!("csrf_token={token}&student_id=1&event_id=1&rating=4&comment=Great"),
        ),
    )
    .await;
    assert!(page.body.contains("Feedback submitted!"));
}

#[tokio::test]
async fn dashboard_lists_reports() {
    let frontend = Frontend::new(MemoryApi::seeded(), TIMINGS);
    let page = send(&frontend, get("/dashboard", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Event Popularity"));
    assert!(page.body.contains("Sports Day"));
    assert!(page.body.contains("Alice Cooper"));
}

#[tokio::test]
async fn unknown_pages_render_the_error_page() {
    let frontend = Frontend::new(MemoryApi::seeded(), TIMINGS);
    let page = send(&frontend, get("/admin", None)).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.body.contains("Page not found"));

    let page = send(&frontend, get("/register/99", None)).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stylesheet_is_revalidated_by_etag() {
    let frontend = Frontend::new(MemoryApi::seeded(), TIMINGS);
    let page = send(&frontend, get("/index.css", None)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(".navbar"));
    let etag = page.headers[ETAG].clone();

    let request = Request::builder()
        .uri("/index.css")
        .header(IF_NONE_MATCH, etag)
        .body(Full::new(Bytes::new()))
        .unwrap();
    let page = send(&frontend, request).await;
    assert_eq!(page.status, StatusCode::NOT_MODIFIED);
}
