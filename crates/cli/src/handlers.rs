use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail, eyre};
use scheduler_client::AppState;
use scheduler_client::appointments::{self, AppointmentBook};
use scheduler_client::booking::{BookingObserver, BookingSession};
use scheduler_core::booking::{BookingStage, Notice, parse_selector_id};
use scheduler_core::errors::SchedulerError;
use scheduler_core::models::appointment::{AppointmentListKind, AppointmentUpdate, StatusAction};
use scheduler_core::models::availability::AvailabilityStatus;
use scheduler_core::sorting::SortColumn;
use tracing::{info, warn};

use crate::render;

/// Prints booking notices and refreshes the listing after a booking.
pub struct TerminalObserver {
    state: AppState,
}

impl TerminalObserver {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BookingObserver for TerminalObserver {
    fn on_notice(&self, notice: &Notice) {
        match notice {
            Notice::Info(text) => println!("{text}"),
            Notice::Alert(text) => eprintln!("Alert: {text}"),
        }
    }

    async fn reload_appointments(&self) {
        let refreshed = async {
            let mut book = self.state.appointment_book().await?;
            book.load(AppointmentListKind::Upcoming).await?;
            Ok::<_, SchedulerError>(render::appointments(book.rows()))
        };
        match refreshed.await {
            Ok(listing) => println!("\nUpcoming appointments:\n{listing}"),
            Err(err) => warn!(error = %err, "Could not refresh appointments"),
        }
    }
}

pub async fn courses(state: &AppState) -> Result<()> {
    let courses = state.courses().await?;
    if courses.is_empty() {
        println!("You are not enrolled in any course with appointment-based programs.");
    } else {
        println!("{}", render::courses(&courses));
    }
    Ok(())
}

/// Opens a booking and drives it to the slot list of `program`.
async fn open_program(state: &AppState, course: &str, program: &str) -> Result<BookingSession> {
    let observer = Arc::new(TerminalObserver::new(state.clone()));
    let mut booking = state.booking(observer).await?;

    booking.select_course(course).await;
    if booking.flow().selection().course_id.is_none() {
        bail!("`{course}` is not one of your courses");
    }

    let known_program = parse_selector_id(program)
        .and_then(|id| booking.flow().selected_course()?.program(id))
        .is_some();
    if !known_program {
        bail!("`{program}` is not a program of this course");
    }

    booking.select_program(program).await;
    match booking.flow().stage() {
        BookingStage::PickingSlot | BookingStage::DropInSelected => Ok(booking),
        _ => Err(eyre!("No appointments could be loaded for this program")),
    }
}

pub async fn slots(state: &AppState, course: &str, program: &str) -> Result<()> {
    let booking = open_program(state, course, program).await?;
    if booking.flow().stage() == BookingStage::PickingSlot && !booking.flow().slots().is_empty() {
        println!("{}", render::slots(booking.flow()));
    }
    Ok(())
}

pub async fn book(state: &AppState, course: &str, program: &str, slot: i64, notes: &str) -> Result<()> {
    let mut booking = open_program(state, course, program).await?;
    if booking.flow().stage() == BookingStage::DropInSelected {
        return Ok(());
    }

    booking.choose_slot(slot).await;
    if !booking.flow().can_confirm() {
        bail!("Slot {slot} is not open. Run `scheduler slots` to see the open slots.");
    }
    booking.edit_notes(notes).await;
    if let Some(details) = booking.flow().slot_details() {
        println!("{details}\n");
    }

    booking.confirm().await;
    match booking.flow().confirmation() {
        Some(confirmation) => {
            println!("{confirmation}");
            Ok(())
        }
        None => Err(eyre!("The appointment was not booked")),
    }
}

pub async fn list_appointments(
    state: &AppState,
    kind: AppointmentListKind,
    sort: Option<SortColumn>,
) -> Result<()> {
    let mut book = state.appointment_book().await?;
    book.load(kind).await?;
    if book.rows().is_empty() {
        println!("No {} appointments.", kind.as_str());
        return Ok(());
    }
    if let Some(column) = sort {
        book.sort_by(column);
    }
    println!("{}", render::appointments(book.rows()));
    Ok(())
}

/// Loads every appointment so any id the user passes can be found.
async fn full_book(state: &AppState) -> Result<AppointmentBook> {
    let mut book = state.appointment_book().await?;
    book.load(AppointmentListKind::All).await?;
    Ok(book)
}

pub async fn change_status(state: &AppState, id: i64, action: StatusAction) -> Result<()> {
    let mut book = full_book(state).await?;
    let status = book.change_status(id, action).await?;
    println!("Appointment {id} is now {status}.");
    Ok(())
}

pub async fn cancel(state: &AppState, id: i64) -> Result<()> {
    let mut book = full_book(state).await?;
    book.cancel(id).await?;
    println!("Appointment {id} was canceled.");
    Ok(())
}

pub async fn edit(state: &AppState, id: i64, update: AppointmentUpdate) -> Result<()> {
    let mut book = full_book(state).await?;
    book.update_details(id, update).await?;
    println!("Appointment {id} was updated.");
    Ok(())
}

pub async fn feedback(state: &AppState, id: i64, rating: &str, comments: &str) -> Result<()> {
    let book = state.appointment_book().await?;
    if book.has_feedback(id).await? {
        bail!("You already left feedback for appointment {id}");
    }
    book.submit_feedback(id, rating, comments).await?;
    println!("Thanks for your feedback!");
    Ok(())
}

pub async fn drop_ins(state: &AppState, course: i64, sort: Option<SortColumn>) -> Result<()> {
    let mut table = appointments::load_drop_ins(state.api.as_ref(), course).await?;
    if let Some(column) = sort {
        table.sort_by(column);
    }
    println!("{}", render::drop_ins(table.rows()));
    Ok(())
}

pub async fn availability(state: &AppState, course: i64, sort: Option<SortColumn>) -> Result<()> {
    let mut table = appointments::load_availability(state.api.as_ref(), course).await?;
    if let Some(column) = sort {
        table.sort_by(column);
    }
    println!("{}", render::availability(table.rows()));
    Ok(())
}

pub async fn availability_status(state: &AppState, id: i64, status: AvailabilityStatus) -> Result<()> {
    match appointments::set_availability_status(state.api.as_ref(), id, status).await {
        Ok(()) => {
            println!("Availability {id} is now {}.", status.as_str());
            Ok(())
        }
        Err(err) if err.is_conflict() => Err(eyre!(err.user_message())),
        Err(err) => Err(err.into()),
    }
}

pub async fn program_limits(
    state: &AppState,
    course_id: i64,
    program_id: i64,
    daily: Option<u32>,
    weekly: Option<u32>,
    monthly: Option<u32>,
) -> Result<()> {
    let courses = state.api.instructor_courses().await?;
    let mut program = courses
        .iter()
        .find(|course| course.id == course_id)
        .and_then(|course| course.program(program_id))
        .cloned()
        .ok_or_else(|| eyre!("Program {program_id} is not part of course {course_id}"))?;

    program.max_daily_meetings = daily.or(program.max_daily_meetings);
    program.max_weekly_meetings = weekly.or(program.max_weekly_meetings);
    program.max_monthly_meetings = monthly.or(program.max_monthly_meetings);
    state.save_program(course_id, program).await?;
    println!("Meeting limits saved.");
    Ok(())
}

pub async fn calendar_events(state: &AppState) -> Result<()> {
    let events = state.calendar.events().await?;
    info!(count = events.len(), "Calendar events loaded");
    println!("{}", render::events(&events));
    Ok(())
}

pub fn calendar_login(state: &AppState) {
    println!(
        "Open this link to connect your calendar:\n{}",
        state.calendar.login_url()
    );
}
