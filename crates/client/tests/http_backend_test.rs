use std::sync::Arc;

use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use scheduler_client::backend::{HttpBackend, SchedulerApi};
use scheduler_client::calendar::{CalendarApi, OutlookCalendar};
use scheduler_client::config::ClientConfig;
use scheduler_client::session::Session;
use scheduler_core::errors::SchedulerError;
use scheduler_core::models::appointment::{
    AppointmentListKind, AppointmentStatus, ReservationRequest,
};
use scheduler_core::models::availability::AvailabilityStatus;
use scheduler_core::models::course::Program;
use scheduler_core::models::user::AccountType;
use serde_json::json;
use tracing::Level;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_url: server.uri(),
        calendar_url: server.uri(),
        timezone: Tz::America__Los_Angeles,
        log_level: Level::DEBUG,
        request_timeout: 5,
    }
}

fn backend_for(server: &MockServer) -> (HttpBackend, Arc<Session>) {
    let config = config_for(server);
    let session = Arc::new(Session::new(&config.api_url).expect("valid url"));
    let backend = HttpBackend::new(&config, Arc::clone(&session)).expect("client builds");
    (backend, session)
}

fn reservation() -> ReservationRequest {
    ReservationRequest {
        notes: "test".to_string(),
        summary: "CS 101 - Office Hours".to_string(),
        start: "2024-05-01T21:00:00.000Z".to_string(),
        end: "2024-05-01T21:30:00.000Z".to_string(),
        attendees: vec!["student@example.edu".to_string()],
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"email": "student@example.edu", "password": "hunter2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "access_token_cookie=jwt; Path=/; HttpOnly")
                .append_header("Set-Cookie", "csrf_access_token=abc%2B123; Path=/")
                .set_body_json(json!({"message": "Login successful"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "name": "Sam Student",
            "email": "student@example.edu",
            "account_type": "student",
            "status": "active"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_stores_csrf_cookie() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let (backend, session) = backend_for(&server);

    let profile = backend.login("student@example.edu", "hunter2").await.unwrap();

    assert_eq!(profile.account_type, AccountType::Student);
    assert_eq!(session.csrf_token().as_deref(), Some("abc+123"));
}

#[tokio::test]
async fn test_reserve_sends_csrf_header_and_payload() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/student/appointments/reserve/42/1"))
        .and(header("X-CSRF-TOKEN", "abc+123"))
        .and(body_json(json!({
            "notes": "test",
            "summary": "CS 101 - Office Hours",
            "start": "2024-05-01T21:00:00.000Z",
            "end": "2024-05-01T21:30:00.000Z",
            "attendees": ["student@example.edu"]
        })))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"message": "Appointment pending", "status": "pending"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);
    backend.login("student@example.edu", "hunter2").await.unwrap();

    let response = backend.reserve(42, 1, &reservation()).await.unwrap();

    assert_eq!(response.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_reserve_conflict_maps_to_conflict_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/student/appointments/reserve/42/1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "Meeting limit reached"})),
        )
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let error = backend.reserve(42, 1, &reservation()).await.unwrap_err();

    assert!(error.is_conflict());
    assert_eq!(error.user_message(), "Meeting limit reached");
}

#[tokio::test]
async fn test_server_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/programs/appointment-based"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let error = backend.student_courses().await.unwrap_err();

    match error {
        SchedulerError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_student_without_courses_gets_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/programs/appointment-based"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "no courses found for student"})),
        )
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let courses = backend.student_courses().await.unwrap();

    assert!(courses.is_empty());
}

#[tokio::test]
async fn test_unknown_student_is_still_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/programs/appointment-based"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Student not found"})))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let error = backend.student_courses().await.unwrap_err();

    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn test_instructor_without_courses_gets_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instructor/programs"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let courses = backend.instructor_courses().await.unwrap();

    assert!(courses.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/appointments/available/10/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let error = backend.available_slots(10, 1).await.unwrap_err();

    assert!(matches!(error, SchedulerError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_available_slots_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/appointments/available/10/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "available_appointments": [
                {"appointment_id": 1, "date": "2024-05-01", "start_time": "14:00", "end_time": "14:30", "status": "posted"},
                {"appointment_id": 2, "date": "2024-05-01", "start_time": "15:00", "end_time": "15:30", "status": "reserved"}
            ]
        })))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let slots = backend.available_slots(10, 1).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].status, AvailabilityStatus::Reserved);
}

#[tokio::test]
async fn test_appointments_use_role_scope_and_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instructor/appointments"))
        .and(query_param("type", "pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instructor_appointments": [{
                "appointment_id": 7, "name": "Office Hours", "date": "2024-05-01",
                "start_time": "14:00", "end_time": "14:30", "status": "pending"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let appointments = backend
        .appointments(AccountType::Instructor, AppointmentListKind::Pending)
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id, 7);
}

#[tokio::test]
async fn test_feedback_message_means_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feedback/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "No feedback found for this appointment"})),
        )
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    assert_eq!(backend.feedback(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_program_details_fill_default_caps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/program/details"))
        .and(body_json(json!({
            "course_id": 1,
            "data": {
                "id": 10, "name": "Office Hours", "description": null, "duration": 30,
                "physical_location": null, "meeting_url": null,
                "auto_approve_appointments": false, "isDropins": false, "isRangeBased": false,
                "max_daily_meetings": 2, "max_weekly_meetings": 999, "max_monthly_meetings": 999
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);
    let program = Program {
        id: 10,
        name: "Office Hours".to_string(),
        duration: Some(30),
        max_daily_meetings: Some(2),
        ..Program::default()
    };

    backend.save_program_details(1, &program).await.unwrap();
}

#[tokio::test]
async fn test_availability_status_conflict_carries_server_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instructor/availability/status"))
        .and(body_json(json!({"availability_id": 3, "status": "active"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            json!({"error": "Activating this availability would exceed the weekly meeting limit"}),
        ))
        .mount(&server)
        .await;
    let (backend, _session) = backend_for(&server);

    let error = backend
        .set_availability_status(3, AvailabilityStatus::Active)
        .await
        .unwrap_err();

    assert!(error.is_conflict());
    assert!(error.user_message().contains("weekly meeting limit"));
}

#[tokio::test]
async fn test_logout_clears_session_cookies() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Logged out"})))
        .mount(&server)
        .await;
    let (backend, session) = backend_for(&server);
    backend.login("student@example.edu", "hunter2").await.unwrap();

    backend.logout().await.unwrap();
    session.clear().await;

    assert_eq!(session.csrf_token(), None);
    assert!(session.profile().await.is_none());
}

#[tokio::test]
async fn test_calendar_create_event_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/create_event"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "AAMkAD"})))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(&server);
    let session = Arc::new(Session::new(&config.api_url).unwrap());
    let calendar = OutlookCalendar::new(&config, session).unwrap();

    let event_id = calendar.create_event(&reservation()).await.unwrap();

    assert_eq!(event_id, "AAMkAD");
    assert_eq!(calendar.login_url(), format!("{}/api/login", server.uri()));
}

#[tokio::test]
async fn test_calendar_failures_are_calendar_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete_event/AAMkAD"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Access token not found in session"})),
        )
        .mount(&server)
        .await;
    let config = config_for(&server);
    let session = Arc::new(Session::new(&config.api_url).unwrap());
    let calendar = OutlookCalendar::new(&config, session).unwrap();

    let error = calendar.delete_event("AAMkAD").await.unwrap_err();

    assert!(matches!(error, SchedulerError::Calendar(_)));
}
