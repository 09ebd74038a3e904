//! # Booking Flow
//!
//! A pure reducer for one booking popup. The flow walks
//! course → program → slots → review → submit → confirmation, and every
//! interaction is fed in as a [`BookingEvent`]. [`BookingFlow::apply`]
//! updates the state and returns the [`BookingEffect`]s the caller must
//! perform (network calls, notices). Results of those effects come back in
//! as events again.
//!
//! Each selection change bumps an attempt counter. Fetch and reservation
//! results carry the attempt they were issued under, so answers that arrive
//! after the user moved on (or closed the popup) are dropped.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tracing::{debug, error, info};

use crate::models::appointment::{AppointmentStatus, ReservationRequest};
use crate::models::availability::{AvailabilitySlot, BookableSlot, posted_slots};
use crate::models::course::{Course, Program, ProgramDescription};
use crate::time;

pub const NO_SLOTS_NOTICE: &str = "No available appointments at this time.";
pub const CONFLICT_ALERT: &str = "Sorry, this appointment is no longer available.";
pub const BOOKING_FAILED_ALERT: &str = "Failed to book the session. Please try again.";
pub const SLOTS_FAILED_ALERT: &str = "Failed to load available appointments. Please try again.";
pub const DROP_IN_NOTICE: &str =
    "Drop-in sessions do not need a reservation. Check the drop-in times for this course.";

const RESERVED_MESSAGE: &str =
    "Your appointment has been successfully booked! Here are the details of your confirmed appointment:";
const PENDING_MESSAGE: &str =
    "Your appointment has not been approved yet. Here are the details of the appointment:";
const NO_LOCATION: &str = "No in-person location for this meeting.";
const NO_MEETING_URL: &str = "No URL for this meeting.";

/// Parses a selector value; `""` and `"-1"` mean nothing is selected.
pub fn parse_selector_id(raw: &str) -> Option<i64> {
    match raw.trim() {
        "" | "-1" => None,
        value => value.parse::<i64>().ok().filter(|id| *id >= 0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStage {
    ChoosingCourse,
    ChoosingProgram,
    DropInSelected,
    LoadingSlots,
    PickingSlot,
    ReviewingSlot,
    Submitting,
    Confirmed,
    Closed,
}

/// Transient choices of one booking attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub course_id: Option<i64>,
    pub program_id: Option<i64>,
    pub slot: Option<BookableSlot>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    /// Blocking alert.
    Alert(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Alert(text) => text,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub slot_id: i64,
    pub course_id: i64,
    pub reservation: ReservationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingEvent {
    CoursesLoaded(Vec<Course>),
    DescriptionsLoaded {
        course_id: i64,
        descriptions: Vec<ProgramDescription>,
    },
    CourseSelected(Option<i64>),
    ProgramSelected(Option<i64>),
    SlotsLoaded {
        attempt: u64,
        slots: Vec<AvailabilitySlot>,
    },
    SlotsFailed {
        attempt: u64,
        reason: String,
    },
    SlotChosen(i64),
    NotesEdited(String),
    SlotCancelled,
    ConfirmPressed,
    ReservationAccepted {
        attempt: u64,
        status: AppointmentStatus,
    },
    ReservationConflict {
        attempt: u64,
    },
    ReservationFailed {
        attempt: u64,
        reason: String,
    },
    NewBooking,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingEffect {
    FetchDescriptions {
        course_id: i64,
    },
    FetchSlots {
        attempt: u64,
        program_id: i64,
        course_id: i64,
    },
    Reserve {
        attempt: u64,
        request: BookingRequest,
    },
    /// Create the calendar event and store its id on the appointment.
    LinkCalendarEvent {
        appointment_id: i64,
        event: ReservationRequest,
    },
    ReloadAppointments,
    Notify(Notice),
}

/// Panel shown while a slot is being reviewed.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDetails {
    pub program_name: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub duration_minutes: i64,
    pub notes: String,
}

impl fmt::Display for SlotDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.program_name)?;
        writeln!(f, "{}", time::format_long_date(self.start.date_naive()))?;
        writeln!(
            f,
            "{} ({})",
            time::format_time_range(self.start.time(), self.end.time()),
            time::zone_abbreviation(&self.start)
        )?;
        write!(f, "Duration: {} minutes", self.duration_minutes)?;
        if !self.notes.is_empty() {
            write!(f, "\nNotes: {}", self.notes)?;
        }
        Ok(())
    }
}

/// Rendered outcome of a successful reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub appointment_id: i64,
    pub status: AppointmentStatus,
    pub program_name: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub duration_minutes: i64,
    pub physical_location: Option<String>,
    pub meeting_url: Option<String>,
}

impl Confirmation {
    pub fn title(&self) -> String {
        format!("Appointment Status: {}!", time::capitalize(self.status.as_str()))
    }

    pub fn message(&self) -> &'static str {
        if self.status == AppointmentStatus::Reserved {
            RESERVED_MESSAGE
        } else {
            PENDING_MESSAGE
        }
    }

    pub fn time_range(&self) -> String {
        time::format_time_range(self.start, self.end)
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = non_blank(self.physical_location.as_deref()).unwrap_or(NO_LOCATION);
        let meeting_url = non_blank(self.meeting_url.as_deref()).unwrap_or(NO_MEETING_URL);

        writeln!(f, "{}", self.title())?;
        writeln!(f, "{}", self.message())?;
        writeln!(f, "Name: {}", self.program_name)?;
        writeln!(f, "Date: {}", time::format_long_date(self.date))?;
        writeln!(f, "Time: {}", self.time_range())?;
        writeln!(f, "Duration: {} minutes", self.duration_minutes)?;
        writeln!(f, "In-Person Location: {location}")?;
        write!(f, "Meeting URL: {meeting_url}")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct BookingFlow {
    tz: Tz,
    attendee: String,
    courses: Vec<Course>,
    descriptions: Vec<ProgramDescription>,
    stage: BookingStage,
    selection: Selection,
    slots: Vec<BookableSlot>,
    slot_duration: Option<i64>,
    in_flight: Option<BookingRequest>,
    confirmation: Option<Confirmation>,
    attempt: u64,
}

impl BookingFlow {
    /// `attendee` is the email of the signed-in student.
    pub fn new(tz: Tz, attendee: impl Into<String>) -> Self {
        Self {
            tz,
            attendee: attendee.into(),
            courses: Vec::new(),
            descriptions: Vec::new(),
            stage: BookingStage::ChoosingCourse,
            selection: Selection::default(),
            slots: Vec::new(),
            slot_duration: None,
            in_flight: None,
            confirmation: None,
            attempt: 0,
        }
    }

    pub fn stage(&self) -> BookingStage {
        self.stage
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn slots(&self) -> &[BookableSlot] {
        &self.slots
    }

    /// Minutes per slot for the current fetch, taken from its first slot.
    pub fn slot_duration(&self) -> Option<i64> {
        self.slot_duration
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    pub fn calendar_visible(&self) -> bool {
        matches!(
            self.stage,
            BookingStage::LoadingSlots
                | BookingStage::PickingSlot
                | BookingStage::ReviewingSlot
                | BookingStage::Submitting
        )
    }

    pub fn can_confirm(&self) -> bool {
        self.stage == BookingStage::ReviewingSlot
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.selection.course_id.and_then(|id| self.course(id))
    }

    pub fn selected_program(&self) -> Option<&Program> {
        let program_id = self.selection.program_id?;
        self.selected_course()?.program(program_id)
    }

    pub fn program_description(&self) -> Option<&str> {
        let program_id = self.selection.program_id?;
        self.descriptions
            .iter()
            .find(|description| description.id == program_id)
            .map(ProgramDescription::text)
    }

    pub fn slot_details(&self) -> Option<SlotDetails> {
        let slot = self.selection.slot.as_ref()?;
        Some(SlotDetails {
            program_name: self.selected_program()?.name.clone(),
            start: slot.start,
            end: slot.end,
            duration_minutes: self.duration_for(slot),
            notes: self.selection.notes.clone(),
        })
    }

    pub fn apply(&mut self, event: BookingEvent) -> Vec<BookingEffect> {
        if self.stage == BookingStage::Closed
            && !matches!(event, BookingEvent::NewBooking | BookingEvent::CoursesLoaded(_))
        {
            debug!(?event, "Booking popup is closed, ignoring event");
            return Vec::new();
        }

        if self.input_locked() && is_user_input(&event) {
            debug!(stage = ?self.stage, ?event, "Ignoring input while the booking is locked");
            return Vec::new();
        }

        match event {
            BookingEvent::CoursesLoaded(courses) => self.load_courses(courses),
            BookingEvent::DescriptionsLoaded {
                course_id,
                descriptions,
            } => {
                if self.selection.course_id == Some(course_id) {
                    self.descriptions = descriptions;
                } else {
                    debug!(course_id, "Dropping descriptions for a course no longer selected");
                }
                Vec::new()
            }
            BookingEvent::CourseSelected(course_id) => self.select_course(course_id),
            BookingEvent::ProgramSelected(program_id) => self.select_program(program_id),
            BookingEvent::SlotsLoaded { attempt, slots } => self.slots_loaded(attempt, slots),
            BookingEvent::SlotsFailed { attempt, reason } => {
                if self.is_stale(attempt, BookingStage::LoadingSlots) {
                    return Vec::new();
                }
                error!(attempt, %reason, "Failed to fetch available appointments");
                self.rollback_to_program();
                vec![BookingEffect::Notify(Notice::Alert(SLOTS_FAILED_ALERT.to_string()))]
            }
            BookingEvent::SlotChosen(slot_id) => {
                if !matches!(
                    self.stage,
                    BookingStage::PickingSlot | BookingStage::ReviewingSlot
                ) {
                    return Vec::new();
                }
                match self.slots.iter().find(|slot| slot.id == slot_id) {
                    Some(slot) => {
                        self.selection.slot = Some(slot.clone());
                        self.stage = BookingStage::ReviewingSlot;
                    }
                    None => debug!(slot_id, "Chosen slot is not in the offered list"),
                }
                Vec::new()
            }
            BookingEvent::NotesEdited(notes) => {
                if self.stage == BookingStage::ReviewingSlot {
                    self.selection.notes = notes;
                }
                Vec::new()
            }
            BookingEvent::SlotCancelled => {
                if self.stage == BookingStage::ReviewingSlot {
                    self.selection.slot = None;
                    self.selection.notes.clear();
                    self.stage = BookingStage::PickingSlot;
                }
                Vec::new()
            }
            BookingEvent::ConfirmPressed => self.confirm(),
            BookingEvent::ReservationAccepted { attempt, status } => {
                self.reservation_accepted(attempt, status)
            }
            BookingEvent::ReservationConflict { attempt } => {
                if self.is_stale(attempt, BookingStage::Submitting) {
                    return Vec::new();
                }
                info!(attempt, "Slot was taken before the reservation went through");
                self.rollback_to_program();
                vec![BookingEffect::Notify(Notice::Alert(CONFLICT_ALERT.to_string()))]
            }
            BookingEvent::ReservationFailed { attempt, reason } => {
                if self.is_stale(attempt, BookingStage::Submitting) {
                    return Vec::new();
                }
                error!(attempt, %reason, "Reservation failed");
                self.rollback_to_program();
                vec![BookingEffect::Notify(Notice::Alert(BOOKING_FAILED_ALERT.to_string()))]
            }
            BookingEvent::NewBooking => {
                self.reset(BookingStage::ChoosingCourse);
                Vec::new()
            }
            BookingEvent::Closed => {
                self.reset(BookingStage::Closed);
                Vec::new()
            }
        }
    }

    fn course(&self, course_id: i64) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == course_id)
    }

    fn duration_for(&self, slot: &BookableSlot) -> i64 {
        self.slot_duration.unwrap_or_else(|| slot.duration_minutes())
    }

    fn input_locked(&self) -> bool {
        matches!(self.stage, BookingStage::Submitting | BookingStage::Confirmed)
    }

    fn is_stale(&self, attempt: u64, expected: BookingStage) -> bool {
        let stale = attempt != self.attempt || self.stage != expected;
        if stale {
            debug!(
                attempt,
                current_attempt = self.attempt,
                stage = ?self.stage,
                "Ignoring result of a superseded attempt"
            );
        }
        stale
    }

    fn bump_attempt(&mut self) {
        self.attempt = self.attempt.wrapping_add(1);
    }

    fn clear_downstream(&mut self) {
        self.selection.program_id = None;
        self.selection.slot = None;
        self.selection.notes.clear();
        self.slots.clear();
        self.slot_duration = None;
        self.in_flight = None;
    }

    fn reset(&mut self, stage: BookingStage) {
        self.bump_attempt();
        self.clear_downstream();
        self.selection = Selection::default();
        self.descriptions.clear();
        self.confirmation = None;
        self.stage = stage;
    }

    /// Back to the program selector with nothing downstream kept.
    fn rollback_to_program(&mut self) {
        self.bump_attempt();
        self.clear_downstream();
        self.stage = if self.selection.course_id.is_some() {
            BookingStage::ChoosingProgram
        } else {
            BookingStage::ChoosingCourse
        };
    }

    fn load_courses(&mut self, courses: Vec<Course>) -> Vec<BookingEffect> {
        self.courses = courses;
        let still_listed = self
            .selection
            .course_id
            .is_none_or(|id| self.course(id).is_some());
        if !still_listed && !self.input_locked() && self.stage != BookingStage::Closed {
            self.reset(BookingStage::ChoosingCourse);
        }
        Vec::new()
    }

    fn select_course(&mut self, course_id: Option<i64>) -> Vec<BookingEffect> {
        self.reset(BookingStage::ChoosingCourse);

        let Some(course_id) = course_id.filter(|id| self.course(*id).is_some()) else {
            return Vec::new();
        };
        info!(course_id, "Course selected");
        self.selection.course_id = Some(course_id);
        self.stage = BookingStage::ChoosingProgram;
        vec![BookingEffect::FetchDescriptions { course_id }]
    }

    fn select_program(&mut self, program_id: Option<i64>) -> Vec<BookingEffect> {
        let Some(course_id) = self.selection.course_id else {
            debug!(?program_id, "Program chosen before a course, ignoring");
            return Vec::new();
        };
        self.bump_attempt();
        self.clear_downstream();

        let program = program_id
            .and_then(|id| self.course(course_id).and_then(|course| course.program(id)))
            .cloned();

        match program {
            None => {
                self.stage = BookingStage::ChoosingProgram;
                Vec::new()
            }
            Some(program) if program.is_drop_ins => {
                self.selection.program_id = Some(program.id);
                self.stage = BookingStage::DropInSelected;
                vec![BookingEffect::Notify(Notice::Info(DROP_IN_NOTICE.to_string()))]
            }
            Some(program) => {
                info!(course_id, program_id = program.id, attempt = self.attempt, "Program selected");
                self.selection.program_id = Some(program.id);
                self.stage = BookingStage::LoadingSlots;
                vec![BookingEffect::FetchSlots {
                    attempt: self.attempt,
                    program_id: program.id,
                    course_id,
                }]
            }
        }
    }

    fn slots_loaded(&mut self, attempt: u64, slots: Vec<AvailabilitySlot>) -> Vec<BookingEffect> {
        if self.is_stale(attempt, BookingStage::LoadingSlots) {
            return Vec::new();
        }

        let mut offered = posted_slots(&slots, self.tz);
        self.slot_duration = offered.first().map(BookableSlot::duration_minutes);
        offered.sort_by_key(|slot| slot.start);
        self.slots = offered;
        self.stage = BookingStage::PickingSlot;
        info!(
            attempt,
            offered = self.slots.len(),
            fetched = slots.len(),
            "Available appointments loaded"
        );

        if self.slots.is_empty() {
            vec![BookingEffect::Notify(Notice::Info(NO_SLOTS_NOTICE.to_string()))]
        } else {
            Vec::new()
        }
    }

    fn confirm(&mut self) -> Vec<BookingEffect> {
        if self.stage != BookingStage::ReviewingSlot {
            debug!(stage = ?self.stage, "Confirm is not available");
            return Vec::new();
        }
        let Some(request) = self.build_request() else {
            return Vec::new();
        };

        info!(
            attempt = self.attempt,
            slot_id = request.slot_id,
            course_id = request.course_id,
            "Submitting reservation"
        );
        self.stage = BookingStage::Submitting;
        self.in_flight = Some(request.clone());
        vec![BookingEffect::Reserve {
            attempt: self.attempt,
            request,
        }]
    }

    fn build_request(&self) -> Option<BookingRequest> {
        let course = self.selected_course()?;
        let program = self.selected_program()?;
        let slot = self.selection.slot.as_ref()?;

        Some(BookingRequest {
            slot_id: slot.id,
            course_id: course.id,
            reservation: ReservationRequest {
                notes: self.selection.notes.clone(),
                summary: format!("{} - {}", course.name, program.name),
                start: time::to_utc_iso(&slot.start),
                end: time::to_utc_iso(&slot.end),
                attendees: vec![self.attendee.clone()],
            },
        })
    }

    fn reservation_accepted(&mut self, attempt: u64, status: AppointmentStatus) -> Vec<BookingEffect> {
        if self.is_stale(attempt, BookingStage::Submitting) {
            return Vec::new();
        }
        let (Some(request), Some(slot)) = (self.in_flight.take(), self.selection.slot.clone()) else {
            self.rollback_to_program();
            return Vec::new();
        };

        let program = self.selected_program();
        let confirmation = Confirmation {
            appointment_id: slot.id,
            status,
            program_name: program.map(|p| p.name.clone()).unwrap_or_default(),
            date: slot.date,
            start: slot.start.time(),
            end: slot.end.time(),
            duration_minutes: self.duration_for(&slot),
            physical_location: slot
                .physical_location
                .clone()
                .or_else(|| program.and_then(|p| p.physical_location.clone())),
            meeting_url: slot
                .meeting_url
                .clone()
                .or_else(|| program.and_then(|p| p.meeting_url.clone())),
        };
        info!(attempt, appointment_id = slot.id, %status, "Reservation accepted");

        self.selection = Selection::default();
        self.slots.clear();
        self.slot_duration = None;
        self.confirmation = Some(confirmation);
        self.stage = BookingStage::Confirmed;

        vec![
            BookingEffect::LinkCalendarEvent {
                appointment_id: request.slot_id,
                event: request.reservation,
            },
            BookingEffect::ReloadAppointments,
        ]
    }
}

fn is_user_input(event: &BookingEvent) -> bool {
    matches!(
        event,
        BookingEvent::CourseSelected(_)
            | BookingEvent::ProgramSelected(_)
            | BookingEvent::SlotChosen(_)
            | BookingEvent::NotesEdited(_)
            | BookingEvent::SlotCancelled
            | BookingEvent::ConfirmPressed
    )
}
