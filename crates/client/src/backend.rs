//! # Scheduler Backend
//!
//! [`SchedulerApi`] is the set of backend operations the client relies on;
//! [`HttpBackend`] implements it over the cookie-authenticated REST API.
//! Every mutating call echoes the CSRF cookie in `X-CSRF-TOKEN`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use scheduler_core::errors::{SchedulerError, SchedulerResult};
use scheduler_core::models::{
    appointment::{
        Appointment, AppointmentList, AppointmentListKind, AppointmentStatus, AppointmentUpdate,
        MessageResponse, ReservationRequest, ReservationResponse, StatusUpdateRequest,
        UpdateEventIdRequest,
    },
    availability::{
        AvailabilitySlot, AvailabilityStatus, AvailabilityStatusUpdate, AvailableAppointments,
        DropInTime, InstructorAvailability, InstructorAvailabilityList,
    },
    course::{Course, Program, ProgramDescription, ProgramDetailsRequest},
    feedback::{Feedback, FeedbackLookup, FeedbackRequest},
    user::{AccountType, LoginRequest, UserProfile},
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::session::{CSRF_HEADER, Session};

/// Start of the 404 error a course listing returns for an account without courses.
const NO_COURSES_PREFIX: &str = "no courses found";

#[automock]
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Signs in and returns the profile of the new session.
    async fn login(&self, email: &str, password: &str) -> SchedulerResult<UserProfile>;

    async fn logout(&self) -> SchedulerResult<()>;

    async fn profile(&self) -> SchedulerResult<UserProfile>;

    /// Courses of the signed-in student with their appointment-based programs.
    async fn student_courses(&self) -> SchedulerResult<Vec<Course>>;

    /// Courses the signed-in instructor teaches, with full program settings.
    async fn instructor_courses(&self) -> SchedulerResult<Vec<Course>>;

    async fn program_descriptions(&self, course_id: i64) -> SchedulerResult<Vec<ProgramDescription>>;

    async fn available_slots(
        &self,
        program_id: i64,
        course_id: i64,
    ) -> SchedulerResult<Vec<AvailabilitySlot>>;

    /// Reserves a slot. A taken slot surfaces as [`SchedulerError::Conflict`].
    async fn reserve(
        &self,
        slot_id: i64,
        course_id: i64,
        request: &ReservationRequest,
    ) -> SchedulerResult<ReservationResponse>;

    async fn update_event_id(&self, appointment_id: i64, event_id: &str) -> SchedulerResult<()>;

    async fn appointments(
        &self,
        account_type: AccountType,
        kind: AppointmentListKind,
    ) -> SchedulerResult<Vec<Appointment>>;

    async fn update_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> SchedulerResult<()>;

    async fn cancel_appointment(
        &self,
        account_type: AccountType,
        appointment_id: i64,
    ) -> SchedulerResult<()>;

    async fn update_appointment(
        &self,
        account_type: AccountType,
        appointment_id: i64,
        update: &AppointmentUpdate,
    ) -> SchedulerResult<()>;

    async fn submit_feedback(&self, request: &FeedbackRequest) -> SchedulerResult<()>;

    /// `None` when nobody left feedback for the appointment yet.
    async fn feedback(&self, appointment_id: i64) -> SchedulerResult<Option<Feedback>>;

    async fn drop_ins(&self, course_id: i64) -> SchedulerResult<Vec<DropInTime>>;

    async fn instructor_availability(
        &self,
        course_id: i64,
    ) -> SchedulerResult<Vec<InstructorAvailability>>;

    async fn set_availability_status(
        &self,
        availability_id: i64,
        status: AvailabilityStatus,
    ) -> SchedulerResult<()>;

    async fn save_program_details(&self, course_id: i64, program: &Program) -> SchedulerResult<()>;
}

/// Percent-encodes one path segment.
pub(crate) fn segment(value: impl ToString) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}

pub(crate) fn transport_error(err: reqwest::Error) -> SchedulerError {
    if err.is_decode() {
        SchedulerError::MalformedResponse(err.to_string())
    } else {
        SchedulerError::Network(err.to_string())
    }
}

/// Sends a request and turns non-2xx answers into errors.
///
/// Error bodies of the form `{"error": ...}` or `{"message": ...}` become
/// the error message; 409 maps to [`SchedulerError::Conflict`].
pub(crate) async fn execute(request: RequestBuilder) -> SchedulerResult<Vec<u8>> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if status.is_success() {
        return Ok(body.to_vec());
    }

    let message = serde_json::from_slice::<MessageResponse>(&body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());

    debug!(status = status.as_u16(), %message, "Request rejected");
    if status == StatusCode::CONFLICT {
        Err(SchedulerError::Conflict(message))
    } else if status == StatusCode::UNAUTHORIZED {
        Err(SchedulerError::Authentication(message))
    } else {
        Err(SchedulerError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> SchedulerResult<T> {
    serde_json::from_slice(body).map_err(|err| SchedulerError::MalformedResponse(err.to_string()))
}

/// REST implementation of [`SchedulerApi`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> SchedulerResult<Self> {
        let client = Client::builder()
            .cookie_provider(session.jar())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|err| SchedulerError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method.clone(), self.url(path));
        if method == Method::GET {
            return builder;
        }
        match self.session.csrf_token() {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => {
                debug!(path, "No CSRF cookie present for mutating request");
                builder
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SchedulerResult<T> {
        debug!(path, "GET");
        let body = execute(self.request(Method::GET, path)).await?;
        decode(&body)
    }

    /// Course listings answer "none" with a 404 naming the missing courses or
    /// with an empty 204; both mean an empty list.
    async fn get_courses(&self, path: &str) -> SchedulerResult<Vec<Course>> {
        debug!(path, "GET");
        let body = match execute(self.request(Method::GET, path)).await {
            Ok(body) => body,
            Err(SchedulerError::Http { status: 404, message })
                if message.starts_with(NO_COURSES_PREFIX) =>
            {
                debug!(path, %message, "No courses for this account");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        decode(&body)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
    ) -> SchedulerResult<Vec<u8>> {
        debug!(path, %method, "Sending");
        let mut request = self.request(method, path);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        execute(request).await
    }
}

#[async_trait]
impl SchedulerApi for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> SchedulerResult<UserProfile> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(Method::POST, "/login", Some(&request)).await?;
        let profile = self.profile().await?;
        info!(user_id = profile.id, account_type = ?profile.account_type, "Signed in");
        Ok(profile)
    }

    async fn logout(&self) -> SchedulerResult<()> {
        self.send::<()>(Method::POST, "/logout", None).await?;
        Ok(())
    }

    async fn profile(&self) -> SchedulerResult<UserProfile> {
        self.get("/profile").await
    }

    async fn student_courses(&self) -> SchedulerResult<Vec<Course>> {
        self.get_courses("/student/programs/appointment-based").await
    }

    async fn instructor_courses(&self) -> SchedulerResult<Vec<Course>> {
        self.get_courses("/instructor/programs").await
    }

    async fn program_descriptions(&self, course_id: i64) -> SchedulerResult<Vec<ProgramDescription>> {
        self.get(&format!("/course/programs/{}", segment(course_id))).await
    }

    async fn available_slots(
        &self,
        program_id: i64,
        course_id: i64,
    ) -> SchedulerResult<Vec<AvailabilitySlot>> {
        let path = format!(
            "/student/appointments/available/{}/{}",
            segment(program_id),
            segment(course_id)
        );
        let response: AvailableAppointments = self.get(&path).await?;
        Ok(response.available_appointments)
    }

    async fn reserve(
        &self,
        slot_id: i64,
        course_id: i64,
        request: &ReservationRequest,
    ) -> SchedulerResult<ReservationResponse> {
        let path = format!(
            "/student/appointments/reserve/{}/{}",
            segment(slot_id),
            segment(course_id)
        );
        let body = self.send(Method::POST, &path, Some(request)).await?;
        decode(&body)
    }

    async fn update_event_id(&self, appointment_id: i64, event_id: &str) -> SchedulerResult<()> {
        let path = format!("/student/appointments/update_event_id/{}", segment(appointment_id));
        let request = UpdateEventIdRequest {
            event_id: event_id.to_string(),
        };
        self.send(Method::POST, &path, Some(&request)).await?;
        Ok(())
    }

    async fn appointments(
        &self,
        account_type: AccountType,
        kind: AppointmentListKind,
    ) -> SchedulerResult<Vec<Appointment>> {
        let path = format!(
            "/{}/appointments?type={}",
            account_type.appointment_scope(),
            kind.as_str()
        );
        let list: AppointmentList = self.get(&path).await?;
        Ok(list.appointments)
    }

    async fn update_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> SchedulerResult<()> {
        let request = StatusUpdateRequest {
            appointment_id,
            status,
        };
        self.send(Method::POST, "/appointment/update/status", Some(&request))
            .await?;
        Ok(())
    }

    async fn cancel_appointment(
        &self,
        account_type: AccountType,
        appointment_id: i64,
    ) -> SchedulerResult<()> {
        let path = format!(
            "/{}/appointments/cancel/{}",
            account_type.appointment_scope(),
            segment(appointment_id)
        );
        self.send::<()>(Method::POST, &path, None).await?;
        Ok(())
    }

    async fn update_appointment(
        &self,
        account_type: AccountType,
        appointment_id: i64,
        update: &AppointmentUpdate,
    ) -> SchedulerResult<()> {
        let path = format!(
            "/{}/appointments/update/{}",
            account_type.appointment_scope(),
            segment(appointment_id)
        );
        self.send(Method::PUT, &path, Some(update)).await?;
        Ok(())
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> SchedulerResult<()> {
        self.send(Method::POST, "/feedback/add", Some(request)).await?;
        Ok(())
    }

    async fn feedback(&self, appointment_id: i64) -> SchedulerResult<Option<Feedback>> {
        let lookup: FeedbackLookup = self
            .get(&format!("/feedback/{}", segment(appointment_id)))
            .await?;
        Ok(match lookup {
            FeedbackLookup::Found(feedback) => Some(feedback),
            FeedbackLookup::Missing { .. } => None,
        })
    }

    async fn drop_ins(&self, course_id: i64) -> SchedulerResult<Vec<DropInTime>> {
        self.get(&format!("/course/programs/dropins/{}", segment(course_id)))
            .await
    }

    async fn instructor_availability(
        &self,
        course_id: i64,
    ) -> SchedulerResult<Vec<InstructorAvailability>> {
        let list: InstructorAvailabilityList = self
            .get(&format!("/instructor/availability/{}", segment(course_id)))
            .await?;
        Ok(list.instructor_availability)
    }

    async fn set_availability_status(
        &self,
        availability_id: i64,
        status: AvailabilityStatus,
    ) -> SchedulerResult<()> {
        let request = AvailabilityStatusUpdate {
            availability_id,
            status,
        };
        self.send(Method::POST, "/instructor/availability/status", Some(&request))
            .await
            .inspect_err(|err| {
                if err.is_conflict() {
                    warn!(availability_id, error = %err, "Availability status blocked by meeting limits");
                }
            })?;
        Ok(())
    }

    async fn save_program_details(&self, course_id: i64, program: &Program) -> SchedulerResult<()> {
        let request = ProgramDetailsRequest {
            data: program.clone().with_default_limits()?,
            course_id,
        };
        self.send(Method::POST, "/program/details", Some(&request)).await?;
        Ok(())
    }
}
