use serde::{Deserialize, Serialize};

use crate::errors::{SchedulerError, SchedulerResult};
use crate::models::user::AccountType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub appointment_id: i64,
    pub satisfaction: String,
    pub additional_comments: String,
}

impl FeedbackRequest {
    pub fn new(
        appointment_id: i64,
        satisfaction: impl Into<String>,
        additional_comments: impl Into<String>,
    ) -> SchedulerResult<Self> {
        let satisfaction = satisfaction.into();
        if satisfaction.trim().is_empty() {
            return Err(SchedulerError::Validation(
                "a satisfaction rating is required".to_string(),
            ));
        }
        Ok(Self {
            appointment_id,
            satisfaction,
            additional_comments: additional_comments.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    #[serde(default)]
    pub attendee_id: Option<i64>,
    #[serde(default)]
    pub attendee_rating: Option<serde_json::Value>,
    #[serde(default)]
    pub attendee_notes: Option<String>,
    #[serde(default)]
    pub host_id: Option<i64>,
    #[serde(default)]
    pub host_rating: Option<serde_json::Value>,
    #[serde(default)]
    pub host_notes: Option<String>,
}

impl Feedback {
    /// Whether the side `account_type` speaks for already rated the meeting.
    pub fn left_by(&self, account_type: AccountType) -> bool {
        let rating = match account_type {
            AccountType::Student => &self.attendee_rating,
            AccountType::Instructor | AccountType::Admin => &self.host_rating,
        };
        matches!(rating, Some(value) if !value.is_null())
    }
}

/// `GET /feedback/:id` answers either the record or `{ "message": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackLookup {
    Found(Feedback),
    Missing { message: String },
}

impl FeedbackLookup {
    pub fn feedback(&self) -> Option<&Feedback> {
        match self {
            FeedbackLookup::Found(feedback) => Some(feedback),
            FeedbackLookup::Missing { .. } => None,
        }
    }
}
