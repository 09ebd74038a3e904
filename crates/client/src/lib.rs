//! HTTP side of the meeting scheduler: configuration, the cookie session,
//! the backend and calendar clients, and the async drivers built on the
//! pure logic in `scheduler-core`.

use std::sync::Arc;

use scheduler_core::booking::BookingEvent;
use scheduler_core::errors::{SchedulerError, SchedulerResult};
use scheduler_core::models::course::{Course, Program};
use scheduler_core::models::user::{AccountType, UserProfile};
use tracing::{info, warn};

pub mod appointments;
pub mod backend;
pub mod booking;
pub mod calendar;
pub mod config;
pub mod session;

use appointments::AppointmentBook;
use backend::{HttpBackend, SchedulerApi};
use booking::{BookingObserver, BookingSession};
use calendar::{CalendarApi, OutlookCalendar};
use config::ClientConfig;
use session::Session;

/// Everything a view needs, passed explicitly instead of living in globals.
#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub session: Arc<Session>,
    pub api: Arc<dyn SchedulerApi>,
    pub calendar: Arc<dyn CalendarApi>,
}

impl AppState {
    /// Wires the HTTP clients for `config`.
    pub fn connect(config: ClientConfig) -> SchedulerResult<Self> {
        let session = Arc::new(Session::new(&config.api_url)?);
        let api = Arc::new(HttpBackend::new(&config, Arc::clone(&session))?);
        let calendar = Arc::new(OutlookCalendar::new(&config, Arc::clone(&session))?);
        Ok(Self::with_services(config, session, api, calendar))
    }

    pub fn with_services(
        config: ClientConfig,
        session: Arc<Session>,
        api: Arc<dyn SchedulerApi>,
        calendar: Arc<dyn CalendarApi>,
    ) -> Self {
        Self {
            config,
            session,
            api,
            calendar,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> SchedulerResult<UserProfile> {
        let profile = self.api.login(email, password).await?;
        self.session.set_profile(profile.clone()).await;
        Ok(profile)
    }

    /// Cached profile, fetched once per session.
    pub async fn current_user(&self) -> SchedulerResult<UserProfile> {
        if let Some(profile) = self.session.profile().await {
            return Ok(profile);
        }
        let profile = self.api.profile().await?;
        self.session.set_profile(profile.clone()).await;
        Ok(profile)
    }

    /// Ends the session; local state is dropped even if the backend call fails.
    pub async fn logout(&self) -> SchedulerResult<()> {
        let result = self.api.logout().await;
        if let Err(err) = &result {
            warn!(error = %err, "Logout request failed");
        }
        self.session.clear().await;
        info!("Signed out");
        result
    }

    pub async fn courses(&self) -> SchedulerResult<Vec<Course>> {
        if let Some(courses) = self.session.courses().await {
            return Ok(courses);
        }
        let courses = self.api.student_courses().await?;
        self.session.cache_courses(courses.clone()).await;
        Ok(courses)
    }

    /// Opens a booking popup for the signed-in student with courses loaded.
    pub async fn booking(&self, observer: Arc<dyn BookingObserver>) -> SchedulerResult<BookingSession> {
        let user = self.current_user().await?;
        if user.account_type != AccountType::Student {
            return Err(SchedulerError::Authentication(
                "only students can book appointments".to_string(),
            ));
        }

        let mut booking = BookingSession::new(
            Arc::clone(&self.api),
            Arc::clone(&self.calendar),
            observer,
            self.config.timezone,
            user.email,
        );
        booking
            .dispatch(BookingEvent::CoursesLoaded(self.courses().await?))
            .await;
        Ok(booking)
    }

    pub async fn appointment_book(&self) -> SchedulerResult<AppointmentBook> {
        let user = self.current_user().await?;
        Ok(AppointmentBook::new(
            Arc::clone(&self.api),
            Arc::clone(&self.calendar),
            user.account_type,
        ))
    }

    /// Saves a program's settings after checking its meeting caps.
    pub async fn save_program(&self, course_id: i64, program: Program) -> SchedulerResult<()> {
        let program = program.with_default_limits()?;
        self.api.save_program_details(course_id, &program).await?;
        info!(course_id, program_id = program.id, "Program details saved");
        Ok(())
    }
}
