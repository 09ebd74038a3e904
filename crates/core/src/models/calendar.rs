use serde::{Deserialize, Serialize};

/// Answer of the calendar service when an event is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocation {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Calendar entry as listed by `/api/get_calendar_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub location: Option<EventLocation>,
}

impl CalendarEvent {
    pub fn title(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no title)")
    }
}
