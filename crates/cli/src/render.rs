//! Plain-text rendering of listings for the terminal.

use scheduler_core::booking::BookingFlow;
use scheduler_core::models::appointment::Appointment;
use scheduler_core::models::availability::{DropInTime, InstructorAvailability};
use scheduler_core::models::calendar::CalendarEvent;
use scheduler_core::models::course::Course;
use scheduler_core::time;

/// Lays out rows under their headers with columns padded to the widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut out = vec![
        padded_line(headers.iter().copied(), &widths),
        padded_line(rule.iter().map(String::as_str), &widths),
    ];
    for row in rows {
        out.push(padded_line(row.iter().map(String::as_str), &widths));
    }
    out.join("\n")
}

fn padded_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => "-".to_string(),
    }
}

pub fn courses(courses: &[Course]) -> String {
    let rows: Vec<Vec<String>> = courses
        .iter()
        .flat_map(|course| {
            course.programs.iter().map(move |program| {
                vec![
                    course.id.to_string(),
                    course.name.clone(),
                    program.id.to_string(),
                    program.name.clone(),
                    program
                        .duration
                        .map(|minutes| format!("{minutes} min"))
                        .unwrap_or_else(|| "-".to_string()),
                    if program.is_drop_ins { "drop-in" } else { "appointment" }.to_string(),
                ]
            })
        })
        .collect();
    table(&["Course", "Course Name", "Program", "Name", "Length", "Kind"], &rows)
}

/// Offered slots of the flow, with the program description above them.
pub fn slots(flow: &BookingFlow) -> String {
    let mut out = String::new();
    if let Some(program) = flow.selected_program() {
        out.push_str(&program.name);
        out.push('\n');
    }
    if let Some(description) = flow.program_description() {
        out.push_str(description);
        out.push_str("\n\n");
    }

    let rows: Vec<Vec<String>> = flow
        .slots()
        .iter()
        .map(|slot| {
            vec![
                slot.id.to_string(),
                time::format_long_date(slot.date),
                format!(
                    "{} ({})",
                    time::format_time_range(slot.start.time(), slot.end.time()),
                    time::zone_abbreviation(&slot.start)
                ),
                or_dash(slot.physical_location.as_deref()),
            ]
        })
        .collect();
    out.push_str(&table(&["Slot", "Date", "Time", "Location"], &rows));
    if let Some(minutes) = flow.slot_duration() {
        out.push_str(&format!("\n\nEach slot lasts {minutes} minutes."));
    }
    out
}

pub fn appointments(appointments: &[Appointment]) -> String {
    let rows: Vec<Vec<String>> = appointments
        .iter()
        .map(|appointment| {
            vec![
                appointment.id.to_string(),
                appointment.name.clone(),
                or_dash(appointment.course_name.as_deref()),
                time::day_name(appointment.date).to_string(),
                appointment.date.format("%Y-%m-%d").to_string(),
                time::format_time_range(appointment.start_time, appointment.end_time),
                or_dash(appointment.physical_location.as_deref()),
                or_dash(appointment.counterpart()),
                time::capitalize(appointment.status.as_str()),
            ]
        })
        .collect();
    table(
        &["Id", "Name", "Course", "Day", "Date", "Time", "Location", "With", "Status"],
        &rows,
    )
}

pub fn drop_ins(times: &[DropInTime]) -> String {
    let rows: Vec<Vec<String>> = times
        .iter()
        .map(|drop_in| {
            vec![
                drop_in.name.clone(),
                time::day_name(drop_in.date).to_string(),
                drop_in.date.format("%Y-%m-%d").to_string(),
                time::format_time_range(drop_in.start_time, drop_in.end_time),
            ]
        })
        .collect();
    table(&["Name", "Day", "Date", "Time"], &rows)
}

pub fn availability(windows: &[InstructorAvailability]) -> String {
    let rows: Vec<Vec<String>> = windows
        .iter()
        .map(|window| {
            vec![
                window.id.to_string(),
                window.name.clone(),
                time::day_name(window.date).to_string(),
                window.date.format("%Y-%m-%d").to_string(),
                time::format_time_range(window.start_time, window.end_time),
                time::capitalize(window.status.as_str()),
                if window.is_drop_ins { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    table(
        &["Id", "Name", "Day", "Date", "Time", "Status", "Drop-in"],
        &rows,
    )
}

pub fn events(events: &[CalendarEvent]) -> String {
    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|event| {
            vec![
                event.title().to_string(),
                event.start.date_time.clone(),
                event.end.date_time.clone(),
                or_dash(
                    event
                        .location
                        .as_ref()
                        .and_then(|location| location.display_name.as_deref()),
                ),
            ]
        })
        .collect();
    table(&["Title", "Start", "End", "Location"], &rows)
}
