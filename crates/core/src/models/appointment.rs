use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{SchedulerError, SchedulerResult};
use crate::sorting::TableRow;
use crate::time::wall_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Posted,
    Pending,
    Reserved,
    Completed,
    Missed,
    Canceled,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Posted => "posted",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Reserved => "reserved",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Missed => "missed",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status changes a host or attendee can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Approve,
    Cancel,
    Attend,
    Miss,
}

impl StatusAction {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            StatusAction::Approve => AppointmentStatus::Reserved,
            StatusAction::Cancel => AppointmentStatus::Canceled,
            StatusAction::Attend => AppointmentStatus::Completed,
            StatusAction::Miss => AppointmentStatus::Missed,
        }
    }

    pub fn allowed_from(&self, current: AppointmentStatus) -> bool {
        use AppointmentStatus::{Pending, Reserved};
        match self {
            StatusAction::Approve => current == Pending,
            StatusAction::Cancel => matches!(current, Pending | Reserved),
            StatusAction::Attend | StatusAction::Miss => current == Reserved,
        }
    }

    /// Resulting status, or a validation error when `current` does not allow the action.
    pub fn apply(&self, current: AppointmentStatus) -> SchedulerResult<AppointmentStatus> {
        if self.allowed_from(current) {
            Ok(self.target())
        } else {
            Err(SchedulerError::Validation(format!(
                "cannot {self} an appointment that is {current}"
            )))
        }
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusAction::Approve => "approve",
            StatusAction::Cancel => "cancel",
            StatusAction::Attend => "attend",
            StatusAction::Miss => "miss",
        };
        f.write_str(name)
    }
}

impl FromStr for StatusAction {
    type Err = SchedulerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(StatusAction::Approve),
            "cancel" => Ok(StatusAction::Cancel),
            "attend" | "attended" => Ok(StatusAction::Attend),
            "miss" | "missed" => Ok(StatusAction::Miss),
            other => Err(SchedulerError::Validation(format!("unknown status action `{other}`"))),
        }
    }
}

/// The other side of an appointment: the host for attendees, the attendee for
/// hosts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pronouns: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "appointment_id")]
    pub id: i64,
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub course_id: Option<i64>,
    /// Program name.
    pub name: String,
    #[serde(default)]
    pub course_name: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default, deserialize_with = "participant")]
    pub host: Option<Participant>,
    #[serde(default, deserialize_with = "participant")]
    pub attendee: Option<Participant>,
}

impl Appointment {
    /// Name of whoever the caller meets, if the backend sent one.
    pub fn counterpart(&self) -> Option<&str> {
        self.attendee
            .as_ref()
            .or(self.host.as_ref())
            .map(|participant| participant.name.as_str())
    }
}

/// The backend sends `{}` when nobody holds that side of the appointment.
fn participant<'de, D>(deserializer: D) -> Result<Option<Participant>, D::Error>
where
    D: Deserializer<'de>,
{
    let participant = Option::<Participant>::deserialize(deserializer)?;
    Ok(participant.filter(|participant| !participant.name.trim().is_empty()))
}

impl TableRow for Appointment {
    fn name(&self) -> &str {
        &self.name
    }

    fn course_name(&self) -> Option<&str> {
        self.course_name.as_deref()
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    fn location(&self) -> Option<&str> {
        self.physical_location.as_deref()
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

/// Listing endpoints key the array by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentList {
    #[serde(alias = "student_appointments", alias = "instructor_appointments")]
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentListKind {
    #[default]
    Upcoming,
    Pending,
    Past,
    All,
}

impl AppointmentListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentListKind::Upcoming => "upcoming",
            AppointmentListKind::Pending => "pending",
            AppointmentListKind::Past => "past",
            AppointmentListKind::All => "all",
        }
    }
}

impl FromStr for AppointmentListKind {
    type Err = SchedulerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(AppointmentListKind::Upcoming),
            "pending" => Ok(AppointmentListKind::Pending),
            "past" => Ok(AppointmentListKind::Past),
            "all" => Ok(AppointmentListKind::All),
            other => Err(SchedulerError::Validation(format!("unknown appointment list `{other}`"))),
        }
    }
}

/// Body of the reserve call; the calendar service receives the same payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub notes: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEventIdRequest {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub appointment_id: i64,
    pub status: AppointmentStatus,
}

/// Editable appointment details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub notes: String,
    pub meeting_url: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
