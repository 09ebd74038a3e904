use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::errors::SchedulerError;

/// Columns a table can be re-sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    CourseName,
    Day,
    Date,
    Location,
    Status,
    DropIns,
}

impl FromStr for SortColumn {
    type Err = SchedulerError;

    /// Accepts the table header labels as well as their lowercase forms.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortColumn::Name),
            "course_name" | "course" => Ok(SortColumn::CourseName),
            "day" => Ok(SortColumn::Day),
            "date" => Ok(SortColumn::Date),
            "location" => Ok(SortColumn::Location),
            "status" => Ok(SortColumn::Status),
            "dropins" | "drop-ins" => Ok(SortColumn::DropIns),
            other => Err(SchedulerError::Validation(format!("unknown sort column `{other}`"))),
        }
    }
}

/// What a listing row exposes to the sorter.
pub trait TableRow {
    fn name(&self) -> &str;

    fn course_name(&self) -> Option<&str> {
        None
    }

    fn date(&self) -> NaiveDate;

    fn start_time(&self) -> NaiveTime;

    fn location(&self) -> Option<&str> {
        None
    }

    fn status(&self) -> Option<&str> {
        None
    }

    fn is_drop_in(&self) -> bool {
        false
    }
}

/// Monday is 0 and Friday 4; weekend days follow Friday.
pub fn weekday_rank(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn compare_rows<R: TableRow>(a: &R, b: &R, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => compare_text(Some(a.name()), Some(b.name())),
        SortColumn::CourseName => compare_text(a.course_name(), b.course_name()),
        SortColumn::Day => weekday_rank(a.date()).cmp(&weekday_rank(b.date())),
        SortColumn::Date => (a.date(), a.start_time()).cmp(&(b.date(), b.start_time())),
        SortColumn::Location => compare_text(a.location(), b.location()),
        SortColumn::Status => compare_text(a.status(), b.status()),
        SortColumn::DropIns => a.is_drop_in().cmp(&b.is_drop_in()),
    }
}

/// Stable ascending sort; ties keep their fetched order.
pub fn sort_rows<R: TableRow>(rows: &mut [R], column: SortColumn) {
    rows.sort_by(|a, b| compare_rows(a, b, column));
}

/// Order used right after a fetch: date, then start time.
pub fn sort_chronologically<R: TableRow>(rows: &mut [R]) {
    sort_rows(rows, SortColumn::Date);
}
