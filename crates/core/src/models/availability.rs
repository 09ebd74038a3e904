use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::SchedulerResult;
use crate::sorting::TableRow;
use crate::time::{self, wall_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Posted,
    Reserved,
    Pending,
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Posted => "posted",
            AvailabilityStatus::Reserved => "reserved",
            AvailabilityStatus::Pending => "pending",
            AvailabilityStatus::Active => "active",
            AvailabilityStatus::Inactive => "inactive",
            AvailabilityStatus::Unknown => "unknown",
        }
    }
}

/// A server-defined window, as returned by the availability endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    #[serde(rename = "appointment_id")]
    pub id: i64,
    #[serde(default)]
    pub program_id: Option<i64>,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub status: AvailabilityStatus,
    #[serde(default, rename = "isDropins")]
    pub is_drop_in: bool,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
}

impl AvailabilitySlot {
    pub fn is_bookable(&self) -> bool {
        self.status == AvailabilityStatus::Posted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableAppointments {
    pub available_appointments: Vec<AvailabilitySlot>,
}

/// A posted slot pinned to real instants in the user's zone.
#[derive(Debug, Clone, PartialEq)]
pub struct BookableSlot {
    pub id: i64,
    pub date: NaiveDate,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub physical_location: Option<String>,
    pub meeting_url: Option<String>,
}

impl BookableSlot {
    pub fn resolve(slot: &AvailabilitySlot, tz: Tz) -> SchedulerResult<Self> {
        let (start, end) = time::slot_bounds(tz, slot.date, slot.start_time, slot.end_time)?;
        Ok(Self {
            id: slot.id,
            date: slot.date,
            start,
            end,
            physical_location: slot.physical_location.clone(),
            meeting_url: slot.meeting_url.clone(),
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        time::minutes_between(&self.start, &self.end)
    }
}

/// Posted slots resolved in the order the server returned them.
///
/// Slots whose start does not exist on the local clock are dropped.
pub fn posted_slots(slots: &[AvailabilitySlot], tz: Tz) -> Vec<BookableSlot> {
    slots
        .iter()
        .filter(|slot| slot.is_bookable())
        .filter_map(|slot| match BookableSlot::resolve(slot, tz) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                warn!(slot_id = slot.id, error = %err, "Skipping slot that cannot be placed on the local clock");
                None
            }
        })
        .collect()
}

/// Informational drop-in window; nothing to reserve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropInTime {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
}

impl TableRow for DropInTime {
    fn name(&self) -> &str {
        &self.name
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    fn is_drop_in(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorAvailability {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub course_name: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub status: AvailabilityStatus,
    #[serde(default, rename = "isDropins")]
    pub is_drop_ins: bool,
}

impl TableRow for InstructorAvailability {
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

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn is_drop_in(&self) -> bool {
        self.is_drop_ins
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorAvailabilityList {
    pub instructor_availability: Vec<InstructorAvailability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityStatusUpdate {
    pub availability_id: i64,
    pub status: AvailabilityStatus,
}
