use serde::{Deserialize, Serialize};

use crate::errors::{SchedulerError, SchedulerResult};

/// Cap applied when a program leaves a meeting limit blank.
pub const DEFAULT_MEETING_LIMIT: u32 = 999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(rename = "course_name")]
    pub name: String,
    #[serde(default)]
    pub programs: Vec<Program>,
}

impl Course {
    pub fn program(&self, program_id: i64) -> Option<&Program> {
        self.programs.iter().find(|program| program.id == program_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Slot length in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub auto_approve_appointments: bool,
    #[serde(default, rename = "isDropins")]
    pub is_drop_ins: bool,
    #[serde(default, rename = "isRangeBased")]
    pub is_range_based: bool,
    #[serde(default)]
    pub max_daily_meetings: Option<u32>,
    #[serde(default)]
    pub max_weekly_meetings: Option<u32>,
    #[serde(default)]
    pub max_monthly_meetings: Option<u32>,
}

impl Program {
    pub fn limits(&self) -> MeetingLimits {
        MeetingLimits {
            daily: self.max_daily_meetings.unwrap_or(DEFAULT_MEETING_LIMIT),
            weekly: self.max_weekly_meetings.unwrap_or(DEFAULT_MEETING_LIMIT),
            monthly: self.max_monthly_meetings.unwrap_or(DEFAULT_MEETING_LIMIT),
        }
    }

    /// Fills blank caps with the default and checks their ordering.
    pub fn with_default_limits(mut self) -> SchedulerResult<Self> {
        let limits = self.limits();
        limits.validate()?;
        self.max_daily_meetings = Some(limits.daily);
        self.max_weekly_meetings = Some(limits.weekly);
        self.max_monthly_meetings = Some(limits.monthly);
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingLimits {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

impl MeetingLimits {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.daily > self.weekly {
            return Err(SchedulerError::Validation(format!(
                "daily meeting limit ({}) cannot exceed weekly limit ({})",
                self.daily, self.weekly
            )));
        }
        if self.weekly > self.monthly {
            return Err(SchedulerError::Validation(format!(
                "weekly meeting limit ({}) cannot exceed monthly limit ({})",
                self.weekly, self.monthly
            )));
        }
        Ok(())
    }
}

impl Default for MeetingLimits {
    fn default() -> Self {
        Self {
            daily: DEFAULT_MEETING_LIMIT,
            weekly: DEFAULT_MEETING_LIMIT,
            monthly: DEFAULT_MEETING_LIMIT,
        }
    }
}

/// Row of `GET /course/programs/:courseId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDescription {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl ProgramDescription {
    pub fn text(&self) -> &str {
        match self.description.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => "No Description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDetailsRequest {
    pub data: Program,
    pub course_id: i64,
}
