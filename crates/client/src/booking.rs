//! Runs a [`BookingFlow`] against the live services.
//!
//! The flow decides, this module performs: each [`BookingEffect`] is executed
//! in order and its outcome is fed back into the flow before the next effect
//! runs. The four calls of a booking (reserve, create calendar event, store
//! event id, refresh) therefore never overlap.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use mockall::automock;
use scheduler_core::booking::{
    BookingEffect, BookingEvent, BookingFlow, BookingRequest, Notice, parse_selector_id,
};
use scheduler_core::errors::SchedulerResult;
use scheduler_core::models::appointment::ReservationRequest;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::backend::SchedulerApi;
use crate::calendar::CalendarApi;

/// What the surrounding view must provide to a booking popup.
#[automock]
#[async_trait]
pub trait BookingObserver: Send + Sync {
    /// Shows a notice; alerts must block until acknowledged.
    fn on_notice(&self, notice: &Notice);

    /// The appointment listing is stale and should be fetched again.
    async fn reload_appointments(&self);
}

pub struct BookingSession {
    api: Arc<dyn SchedulerApi>,
    calendar: Arc<dyn CalendarApi>,
    observer: Arc<dyn BookingObserver>,
    flow: BookingFlow,
}

impl BookingSession {
    pub fn new(
        api: Arc<dyn SchedulerApi>,
        calendar: Arc<dyn CalendarApi>,
        observer: Arc<dyn BookingObserver>,
        tz: Tz,
        attendee: impl Into<String>,
    ) -> Self {
        Self {
            api,
            calendar,
            observer,
            flow: BookingFlow::new(tz, attendee),
        }
    }

    pub fn flow(&self) -> &BookingFlow {
        &self.flow
    }

    /// Fetches the student's courses into the selector.
    pub async fn load_courses(&mut self) -> SchedulerResult<()> {
        let courses = self.api.student_courses().await?;
        info!(count = courses.len(), "Courses loaded");
        self.dispatch(BookingEvent::CoursesLoaded(courses)).await;
        Ok(())
    }

    pub async fn select_course(&mut self, raw: &str) {
        self.dispatch(BookingEvent::CourseSelected(parse_selector_id(raw)))
            .await;
    }

    pub async fn select_program(&mut self, raw: &str) {
        self.dispatch(BookingEvent::ProgramSelected(parse_selector_id(raw)))
            .await;
    }

    pub async fn choose_slot(&mut self, slot_id: i64) {
        self.dispatch(BookingEvent::SlotChosen(slot_id)).await;
    }

    pub async fn edit_notes(&mut self, notes: impl Into<String>) {
        self.dispatch(BookingEvent::NotesEdited(notes.into())).await;
    }

    pub async fn confirm(&mut self) {
        self.dispatch(BookingEvent::ConfirmPressed).await;
    }

    pub async fn close(&mut self) {
        self.dispatch(BookingEvent::Closed).await;
    }

    /// Applies `event` and works off every effect it causes.
    pub async fn dispatch(&mut self, event: BookingEvent) {
        let mut pending: VecDeque<BookingEffect> = self.flow.apply(event).into();
        while let Some(effect) = pending.pop_front() {
            if let Some(outcome) = self.perform(effect).await {
                pending.extend(self.flow.apply(outcome));
            }
        }
    }

    async fn perform(&self, effect: BookingEffect) -> Option<BookingEvent> {
        match effect {
            BookingEffect::FetchDescriptions { course_id } => {
                match self.api.program_descriptions(course_id).await {
                    Ok(descriptions) => Some(BookingEvent::DescriptionsLoaded {
                        course_id,
                        descriptions,
                    }),
                    Err(err) => {
                        warn!(course_id, error = %err, "Program descriptions unavailable");
                        None
                    }
                }
            }
            BookingEffect::FetchSlots {
                attempt,
                program_id,
                course_id,
            } => {
                debug!(attempt, program_id, course_id, "Fetching available appointments");
                Some(match self.api.available_slots(program_id, course_id).await {
                    Ok(slots) => BookingEvent::SlotsLoaded { attempt, slots },
                    Err(err) => BookingEvent::SlotsFailed {
                        attempt,
                        reason: err.to_string(),
                    },
                })
            }
            BookingEffect::Reserve { attempt, request } => {
                let span = info_span!(
                    "reservation",
                    correlation_id = %Uuid::new_v4(),
                    attempt,
                    slot_id = request.slot_id,
                    course_id = request.course_id,
                );
                Some(self.reserve(attempt, request).instrument(span).await)
            }
            BookingEffect::LinkCalendarEvent {
                appointment_id,
                event,
            } => {
                self.link_calendar_event(appointment_id, &event).await;
                None
            }
            BookingEffect::ReloadAppointments => {
                self.observer.reload_appointments().await;
                None
            }
            BookingEffect::Notify(notice) => {
                self.observer.on_notice(&notice);
                None
            }
        }
    }

    async fn reserve(&self, attempt: u64, request: BookingRequest) -> BookingEvent {
        match self
            .api
            .reserve(request.slot_id, request.course_id, &request.reservation)
            .await
        {
            Ok(response) => {
                info!(status = %response.status, "Reservation accepted");
                BookingEvent::ReservationAccepted {
                    attempt,
                    status: response.status,
                }
            }
            Err(err) if err.is_conflict() => {
                info!(error = %err, "Reservation conflicted");
                BookingEvent::ReservationConflict { attempt }
            }
            Err(err) => {
                error!(error = %err, "Reservation request failed");
                BookingEvent::ReservationFailed {
                    attempt,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Mirrors the reservation in the calendar.
    ///
    /// Failures are tolerated: the appointment stays reserved without a
    /// calendar link.
    async fn link_calendar_event(&self, appointment_id: i64, event: &ReservationRequest) {
        let event_id = match self.calendar.create_event(event).await {
            Ok(event_id) => event_id,
            Err(err) => {
                warn!(appointment_id, error = %err, "Reserved without a calendar event");
                return;
            }
        };

        if let Err(err) = self.api.update_event_id(appointment_id, &event_id).await {
            warn!(appointment_id, %event_id, error = %err, "Calendar event id was not stored");
        }
    }
}
