use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, Method, RequestBuilder};
use scheduler_core::errors::{SchedulerError, SchedulerResult};
use scheduler_core::models::appointment::{AppointmentUpdate, ReservationRequest};
use scheduler_core::models::calendar::{CalendarEvent, CreatedEvent};
use tracing::info;

use crate::backend::{decode, execute, segment};
use crate::config::ClientConfig;
use crate::session::{CSRF_HEADER, Session};

/// The external calendar that mirrors booked appointments.
#[automock]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Creates an event and returns its id.
    async fn create_event(&self, event: &ReservationRequest) -> SchedulerResult<String>;

    async fn update_event(&self, event_id: &str, update: &AppointmentUpdate) -> SchedulerResult<()>;

    async fn delete_event(&self, event_id: &str) -> SchedulerResult<()>;

    async fn events(&self) -> SchedulerResult<Vec<CalendarEvent>>;

    /// Where the user must go to connect their calendar account.
    fn login_url(&self) -> String;
}

/// Client for the Outlook calendar service.
///
/// The service keeps its own cookie session, separate from the backend's.
#[derive(Debug, Clone)]
pub struct OutlookCalendar {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl OutlookCalendar {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> SchedulerResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|err| SchedulerError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.calendar_url.clone(),
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/api{}", self.base_url, path));
        match self.session.csrf_token() {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }
}

fn calendar_error(err: SchedulerError) -> SchedulerError {
    match err {
        SchedulerError::Calendar(_) => err,
        other => SchedulerError::Calendar(other.to_string()),
    }
}

#[async_trait]
impl CalendarApi for OutlookCalendar {
    async fn create_event(&self, event: &ReservationRequest) -> SchedulerResult<String> {
        let body = execute(self.request(Method::POST, "/create_event").json(event))
            .await
            .map_err(calendar_error)?;
        let created: CreatedEvent = decode(&body).map_err(calendar_error)?;
        info!(event_id = %created.event_id, "Calendar event created");
        Ok(created.event_id)
    }

    async fn update_event(&self, event_id: &str, update: &AppointmentUpdate) -> SchedulerResult<()> {
        let path = format!("/update_event/{}", segment(event_id));
        execute(self.request(Method::PATCH, &path).json(update))
            .await
            .map_err(calendar_error)?;
        Ok(())
    }

    async fn delete_event(&self, event_id: &str) -> SchedulerResult<()> {
        let path = format!("/delete_event/{}", segment(event_id));
        execute(self.request(Method::DELETE, &path))
            .await
            .map_err(calendar_error)?;
        info!(event_id, "Calendar event deleted");
        Ok(())
    }

    async fn events(&self) -> SchedulerResult<Vec<CalendarEvent>> {
        let body = execute(self.request(Method::GET, "/get_calendar_events"))
            .await
            .map_err(calendar_error)?;
        decode(&body).map_err(calendar_error)
    }

    fn login_url(&self) -> String {
        format!("{}/api/login", self.base_url)
    }
}
