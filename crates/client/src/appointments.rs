use std::sync::Arc;

use scheduler_core::errors::{SchedulerError, SchedulerResult};
use scheduler_core::models::appointment::{
    Appointment, AppointmentListKind, AppointmentStatus, AppointmentUpdate, StatusAction,
};
use scheduler_core::models::availability::{AvailabilityStatus, DropInTime, InstructorAvailability};
use scheduler_core::models::feedback::FeedbackRequest;
use scheduler_core::models::user::AccountType;
use scheduler_core::sorting::{SortColumn, TableRow, sort_chronologically, sort_rows};
use tracing::{info, warn};

use crate::backend::SchedulerApi;
use crate::calendar::CalendarApi;

/// Fetched rows plus the column they are currently ordered by.
///
/// Rows start out in chronological order; re-sorting never refetches.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    rows: Vec<R>,
    sorted_by: Option<SortColumn>,
}

impl<R: TableRow> Table<R> {
    pub fn new(mut rows: Vec<R>) -> Self {
        sort_chronologically(&mut rows);
        Self {
            rows,
            sorted_by: None,
        }
    }

    pub fn sort_by(&mut self, column: SortColumn) {
        sort_rows(&mut self.rows, column);
        self.sorted_by = Some(column);
    }

    pub fn sorted_by(&self) -> Option<SortColumn> {
        self.sorted_by
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            sorted_by: None,
        }
    }
}

pub async fn load_drop_ins(api: &dyn SchedulerApi, course_id: i64) -> SchedulerResult<Table<DropInTime>> {
    Ok(Table::new(api.drop_ins(course_id).await?))
}

pub async fn load_availability(
    api: &dyn SchedulerApi,
    course_id: i64,
) -> SchedulerResult<Table<InstructorAvailability>> {
    Ok(Table::new(api.instructor_availability(course_id).await?))
}

/// The signed-in user's appointments and the actions on them.
pub struct AppointmentBook {
    api: Arc<dyn SchedulerApi>,
    calendar: Arc<dyn CalendarApi>,
    account_type: AccountType,
    table: Table<Appointment>,
}

impl AppointmentBook {
    pub fn new(
        api: Arc<dyn SchedulerApi>,
        calendar: Arc<dyn CalendarApi>,
        account_type: AccountType,
    ) -> Self {
        Self {
            api,
            calendar,
            account_type,
            table: Table::default(),
        }
    }

    pub async fn load(&mut self, kind: AppointmentListKind) -> SchedulerResult<&[Appointment]> {
        let appointments = self.api.appointments(self.account_type, kind).await?;
        info!(kind = kind.as_str(), count = appointments.len(), "Appointments loaded");
        self.table = Table::new(appointments);
        Ok(self.table.rows())
    }

    pub fn sort_by(&mut self, column: SortColumn) {
        self.table.sort_by(column);
    }

    pub fn rows(&self) -> &[Appointment] {
        self.table.rows()
    }

    pub fn get(&self, appointment_id: i64) -> Option<&Appointment> {
        self.table.rows.iter().find(|row| row.id == appointment_id)
    }

    fn get_mut(&mut self, appointment_id: i64) -> SchedulerResult<&mut Appointment> {
        self.table
            .rows
            .iter_mut()
            .find(|row| row.id == appointment_id)
            .ok_or_else(|| {
                SchedulerError::Validation(format!("appointment {appointment_id} is not listed"))
            })
    }

    /// Approve, attend or miss. The transition is checked before any call.
    pub async fn change_status(
        &mut self,
        appointment_id: i64,
        action: StatusAction,
    ) -> SchedulerResult<AppointmentStatus> {
        if action == StatusAction::Cancel {
            self.cancel(appointment_id).await?;
            return Ok(AppointmentStatus::Canceled);
        }

        let current = self.get_mut(appointment_id)?.status;
        let next = action.apply(current)?;
        self.api.update_status(appointment_id, next).await?;
        self.get_mut(appointment_id)?.status = next;
        info!(appointment_id, %current, %next, "Appointment status updated");
        Ok(next)
    }

    /// Cancels the appointment and removes its calendar event.
    pub async fn cancel(&mut self, appointment_id: i64) -> SchedulerResult<()> {
        let appointment = self.get_mut(appointment_id)?;
        StatusAction::Cancel.apply(appointment.status)?;
        let event_id = appointment.event_id.clone();

        self.api
            .cancel_appointment(self.account_type, appointment_id)
            .await?;
        self.get_mut(appointment_id)?.status = AppointmentStatus::Canceled;
        info!(appointment_id, "Appointment canceled");

        if let Some(event_id) = event_id.filter(|id| !id.is_empty()) {
            if let Err(err) = self.calendar.delete_event(&event_id).await {
                warn!(appointment_id, %event_id, error = %err, "Calendar event was not deleted");
            }
        }
        Ok(())
    }

    pub async fn update_details(
        &mut self,
        appointment_id: i64,
        update: AppointmentUpdate,
    ) -> SchedulerResult<()> {
        let event_id = self.get_mut(appointment_id)?.event_id.clone();
        self.api
            .update_appointment(self.account_type, appointment_id, &update)
            .await?;

        if let Some(event_id) = event_id.filter(|id| !id.is_empty()) {
            if let Err(err) = self.calendar.update_event(&event_id, &update).await {
                warn!(appointment_id, %event_id, error = %err, "Calendar event was not updated");
            }
        }

        let appointment = self.get_mut(appointment_id)?;
        appointment.notes = Some(update.notes);
        appointment.meeting_url = Some(update.meeting_url);
        appointment.physical_location = Some(update.location);
        Ok(())
    }

    pub async fn submit_feedback(
        &self,
        appointment_id: i64,
        satisfaction: &str,
        comments: &str,
    ) -> SchedulerResult<()> {
        let request = FeedbackRequest::new(appointment_id, satisfaction, comments)?;
        self.api.submit_feedback(&request).await?;
        info!(appointment_id, "Feedback submitted");
        Ok(())
    }

    /// Whether the signed-in user already rated this appointment.
    pub async fn has_feedback(&self, appointment_id: i64) -> SchedulerResult<bool> {
        Ok(self
            .api
            .feedback(appointment_id)
            .await?
            .is_some_and(|feedback| feedback.left_by(self.account_type)))
    }
}

/// Flips an availability window; a 409 means a meeting cap blocks it.
pub async fn set_availability_status(
    api: &dyn SchedulerApi,
    availability_id: i64,
    status: AvailabilityStatus,
) -> SchedulerResult<()> {
    api.set_availability_status(availability_id, status).await?;
    info!(availability_id, status = status.as_str(), "Availability status changed");
    Ok(())
}
