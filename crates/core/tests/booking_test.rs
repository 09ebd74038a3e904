use chrono::{NaiveDate, NaiveTime};
use chrono_tz::America::Los_Angeles;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use scheduler_core::booking::{
    BOOKING_FAILED_ALERT, BookingEffect, BookingEvent, BookingFlow, BookingStage, CONFLICT_ALERT,
    DROP_IN_NOTICE, NO_SLOTS_NOTICE, Notice, SLOTS_FAILED_ALERT, Selection,
};
use scheduler_core::models::appointment::AppointmentStatus;
use scheduler_core::models::availability::{AvailabilitySlot, AvailabilityStatus};
use scheduler_core::models::course::{Course, Program, ProgramDescription};

const C1: i64 = 1;
const C2: i64 = 2;
const P1: i64 = 10;
const DROP_IN: i64 = 11;

fn courses() -> Vec<Course> {
    vec![
        Course {
            id: C1,
            name: "CS 101".to_string(),
            programs: vec![
                Program {
                    id: P1,
                    name: "Office Hours".to_string(),
                    duration: Some(30),
                    ..Program::default()
                },
                Program {
                    id: DROP_IN,
                    name: "Study Hall".to_string(),
                    is_drop_ins: true,
                    ..Program::default()
                },
            ],
        },
        Course {
            id: C2,
            name: "MATH 200".to_string(),
            programs: vec![Program {
                id: 20,
                name: "Tutoring".to_string(),
                ..Program::default()
            }],
        },
    ]
}

fn slot(id: i64, start: (u32, u32), end: (u32, u32), status: AvailabilityStatus) -> AvailabilitySlot {
    AvailabilitySlot {
        id,
        program_id: Some(P1),
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        status,
        is_drop_in: false,
        physical_location: None,
        meeting_url: None,
    }
}

fn posted(id: i64, start: (u32, u32), end: (u32, u32)) -> AvailabilitySlot {
    slot(id, start, end, AvailabilityStatus::Posted)
}

#[fixture]
fn flow() -> BookingFlow {
    let mut flow = BookingFlow::new(Los_Angeles, "student@example.edu");
    flow.apply(BookingEvent::CoursesLoaded(courses()));
    flow
}

/// Drives the flow to the point where P1's slots were requested.
fn with_program(flow: &mut BookingFlow) -> u64 {
    flow.apply(BookingEvent::CourseSelected(Some(C1)));
    let effects = flow.apply(BookingEvent::ProgramSelected(Some(P1)));
    match effects.as_slice() {
        [BookingEffect::FetchSlots { attempt, .. }] => *attempt,
        other => panic!("expected a slot fetch, got {other:?}"),
    }
}

/// Drives the flow until a reservation is in flight and returns its attempt.
fn submit(flow: &mut BookingFlow, slots: Vec<AvailabilitySlot>, slot_id: i64, notes: &str) -> u64 {
    let attempt = with_program(flow);
    flow.apply(BookingEvent::SlotsLoaded { attempt, slots });
    flow.apply(BookingEvent::SlotChosen(slot_id));
    flow.apply(BookingEvent::NotesEdited(notes.to_string()));
    let effects = flow.apply(BookingEvent::ConfirmPressed);
    match effects.as_slice() {
        [BookingEffect::Reserve { attempt, .. }] => *attempt,
        other => panic!("expected a reservation, got {other:?}"),
    }
}

#[rstest]
fn test_selecting_course_requests_descriptions(mut flow: BookingFlow) {
    let effects = flow.apply(BookingEvent::CourseSelected(Some(C1)));

    assert_eq!(effects, vec![BookingEffect::FetchDescriptions { course_id: C1 }]);
    assert_eq!(flow.stage(), BookingStage::ChoosingProgram);
    assert_eq!(flow.selection().course_id, Some(C1));
}

#[rstest]
fn test_unknown_course_behaves_like_clearing(mut flow: BookingFlow) {
    let effects = flow.apply(BookingEvent::CourseSelected(Some(99)));

    assert!(effects.is_empty());
    assert_eq!(flow.stage(), BookingStage::ChoosingCourse);
    assert_eq!(flow.selection().course_id, None);
}

#[rstest]
fn test_program_selection_fetches_slots_for_the_pair(mut flow: BookingFlow) {
    flow.apply(BookingEvent::CourseSelected(Some(C1)));
    let effects = flow.apply(BookingEvent::ProgramSelected(Some(P1)));

    assert_eq!(
        effects,
        vec![BookingEffect::FetchSlots {
            attempt: flow.attempt(),
            program_id: P1,
            course_id: C1,
        }]
    );
    assert_eq!(flow.stage(), BookingStage::LoadingSlots);
    assert!(flow.calendar_visible());
}

#[rstest]
fn test_program_without_course_is_ignored(mut flow: BookingFlow) {
    let effects = flow.apply(BookingEvent::ProgramSelected(Some(P1)));

    assert!(effects.is_empty());
    assert_eq!(flow.stage(), BookingStage::ChoosingCourse);
}

#[rstest]
fn test_drop_in_program_keeps_calendar_hidden(mut flow: BookingFlow) {
    flow.apply(BookingEvent::CourseSelected(Some(C1)));
    let effects = flow.apply(BookingEvent::ProgramSelected(Some(DROP_IN)));

    assert_eq!(
        effects,
        vec![BookingEffect::Notify(Notice::Info(DROP_IN_NOTICE.to_string()))]
    );
    assert_eq!(flow.stage(), BookingStage::DropInSelected);
    assert!(!flow.calendar_visible());
}

#[rstest]
fn test_only_posted_slots_are_offered(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);

    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![
            slot(1, (9, 0), (9, 30), AvailabilityStatus::Reserved),
            posted(2, (10, 0), (10, 30)),
            slot(3, (11, 0), (11, 30), AvailabilityStatus::Pending),
            slot(4, (12, 0), (12, 30), AvailabilityStatus::Inactive),
            posted(5, (13, 0), (13, 30)),
        ],
    });

    let offered: Vec<i64> = flow.slots().iter().map(|slot| slot.id).collect();
    assert_eq!(offered, vec![2, 5]);
    assert_eq!(flow.stage(), BookingStage::PickingSlot);
}

#[rstest]
fn test_duration_comes_from_first_slot_and_applies_to_all(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);

    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(1, (9, 0), (9, 45)), posted(2, (10, 0), (10, 20))],
    });
    flow.apply(BookingEvent::SlotChosen(2));

    assert_eq!(flow.slot_duration(), Some(45));
    let details = flow.slot_details().expect("slot details should be shown");
    assert_eq!(details.duration_minutes, 45);
}

#[rstest]
fn test_duration_follows_response_order_not_start_order(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);

    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![
            slot(9, (8, 0), (9, 0), AvailabilityStatus::Reserved),
            posted(3, (11, 0), (11, 20)),
            posted(1, (9, 0), (9, 45)),
        ],
    });

    let offered: Vec<i64> = flow.slots().iter().map(|slot| slot.id).collect();
    assert_eq!(offered, vec![1, 3]);
    assert_eq!(flow.slot_duration(), Some(20));
}

#[rstest]
fn test_empty_slot_list_is_a_notice_not_an_error(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);

    let effects = flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![slot(1, (9, 0), (9, 30), AvailabilityStatus::Reserved)],
    });

    assert_eq!(
        effects,
        vec![BookingEffect::Notify(Notice::Info(NO_SLOTS_NOTICE.to_string()))]
    );
    assert!(flow.slots().is_empty());
    assert_eq!(flow.slot_duration(), None);
}

#[rstest]
fn test_fetch_failure_alerts_and_shows_nothing(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);

    let effects = flow.apply(BookingEvent::SlotsFailed {
        attempt,
        reason: "connection reset".to_string(),
    });

    assert_eq!(
        effects,
        vec![BookingEffect::Notify(Notice::Alert(SLOTS_FAILED_ALERT.to_string()))]
    );
    assert!(flow.slots().is_empty());
    assert_eq!(flow.selection().program_id, None);
    assert!(!flow.calendar_visible());
}

#[rstest]
fn test_new_course_clears_program_and_slots(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);
    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(1, (9, 0), (9, 30))],
    });
    flow.apply(BookingEvent::SlotChosen(1));

    flow.apply(BookingEvent::CourseSelected(Some(C2)));

    assert_eq!(flow.selection().course_id, Some(C2));
    assert_eq!(flow.selection().program_id, None);
    assert_eq!(flow.selection().slot, None);
    assert!(flow.slots().is_empty());
    assert_eq!(flow.stage(), BookingStage::ChoosingProgram);
}

#[rstest]
fn test_clearing_program_resets_downstream(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);
    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(1, (9, 0), (9, 30))],
    });
    flow.apply(BookingEvent::SlotChosen(1));
    flow.apply(BookingEvent::NotesEdited("draft".to_string()));

    flow.apply(BookingEvent::ProgramSelected(None));

    assert_eq!(flow.selection().program_id, None);
    assert_eq!(flow.selection().slot, None);
    assert_eq!(flow.selection().notes, "");
    assert!(flow.slots().is_empty());
    assert!(!flow.calendar_visible());
}

#[rstest]
fn test_late_slots_for_superseded_program_are_ignored(mut flow: BookingFlow) {
    let first = with_program(&mut flow);
    flow.apply(BookingEvent::CourseSelected(Some(C2)));

    let effects = flow.apply(BookingEvent::SlotsLoaded {
        attempt: first,
        slots: vec![posted(1, (9, 0), (9, 30))],
    });

    assert!(effects.is_empty());
    assert!(flow.slots().is_empty());
    assert_eq!(flow.stage(), BookingStage::ChoosingProgram);
}

#[rstest]
fn test_descriptions_for_other_course_are_dropped(mut flow: BookingFlow) {
    flow.apply(BookingEvent::CourseSelected(Some(C1)));
    flow.apply(BookingEvent::ProgramSelected(Some(P1)));

    flow.apply(BookingEvent::DescriptionsLoaded {
        course_id: C2,
        descriptions: vec![ProgramDescription {
            id: P1,
            name: "Office Hours".to_string(),
            description: Some("wrong course".to_string()),
            duration: None,
        }],
    });
    assert_eq!(flow.program_description(), None);

    flow.apply(BookingEvent::DescriptionsLoaded {
        course_id: C1,
        descriptions: vec![ProgramDescription {
            id: P1,
            name: "Office Hours".to_string(),
            description: Some("Weekly help".to_string()),
            duration: Some(30),
        }],
    });
    assert_eq!(flow.program_description(), Some("Weekly help"));
}

#[rstest]
fn test_cancelling_slot_allows_reselecting_it(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);
    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(1, (9, 0), (9, 30))],
    });
    flow.apply(BookingEvent::SlotChosen(1));
    flow.apply(BookingEvent::NotesEdited("draft".to_string()));

    flow.apply(BookingEvent::SlotCancelled);

    assert_eq!(flow.stage(), BookingStage::PickingSlot);
    assert_eq!(flow.selection().slot, None);
    assert_eq!(flow.selection().notes, "");
    assert!(!flow.can_confirm());

    flow.apply(BookingEvent::SlotChosen(1));
    assert_eq!(flow.stage(), BookingStage::ReviewingSlot);
    assert_eq!(flow.selection().slot.as_ref().map(|s| s.id), Some(1));
}

#[rstest]
fn test_reservation_payload(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);
    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(42, (14, 0), (14, 30))],
    });
    flow.apply(BookingEvent::SlotChosen(42));
    flow.apply(BookingEvent::NotesEdited("test".to_string()));

    let effects = flow.apply(BookingEvent::ConfirmPressed);

    let [BookingEffect::Reserve { request, .. }] = effects.as_slice() else {
        panic!("expected a reservation, got {effects:?}");
    };
    assert_eq!(request.slot_id, 42);
    assert_eq!(request.course_id, C1);
    assert_eq!(request.reservation.summary, "CS 101 - Office Hours");
    assert_eq!(request.reservation.notes, "test");
    assert_eq!(request.reservation.start, "2024-05-01T21:00:00.000Z");
    assert_eq!(request.reservation.end, "2024-05-01T21:30:00.000Z");
    assert_eq!(request.reservation.attendees, vec!["student@example.edu".to_string()]);
}

#[rstest]
fn test_confirm_is_locked_while_submitting(mut flow: BookingFlow) {
    submit(&mut flow, vec![posted(1, (14, 0), (14, 30))], 1, "");

    let second = flow.apply(BookingEvent::ConfirmPressed);
    let reselect = flow.apply(BookingEvent::CourseSelected(Some(C2)));

    assert!(second.is_empty());
    assert!(reselect.is_empty());
    assert_eq!(flow.stage(), BookingStage::Submitting);
}

#[test_log::test]
fn test_pending_reservation_shows_confirmation() {
    let mut flow = flow();
    let attempt = submit(&mut flow, vec![posted(7, (14, 0), (14, 30))], 7, "test");

    let effects = flow.apply(BookingEvent::ReservationAccepted {
        attempt,
        status: AppointmentStatus::Pending,
    });

    assert_eq!(flow.stage(), BookingStage::Confirmed);
    assert!(matches!(
        effects.as_slice(),
        [
            BookingEffect::LinkCalendarEvent { appointment_id: 7, .. },
            BookingEffect::ReloadAppointments
        ]
    ));

    let confirmation = flow.confirmation().expect("confirmation should be shown");
    assert_eq!(confirmation.title(), "Appointment Status: Pending!");
    assert_eq!(confirmation.time_range(), "2:00 PM - 2:30 PM");

    let rendered = confirmation.to_string();
    assert!(rendered.contains("Appointment Status: Pending!"));
    assert!(rendered.contains("Your appointment has not been approved yet."));
    assert!(rendered.contains("Name: Office Hours"));
    assert!(rendered.contains("Date: Wednesday, May 1st, 2024"));
    assert!(rendered.contains("Time: 2:00 PM - 2:30 PM"));
    assert!(rendered.contains("Duration: 30 minutes"));
    assert!(rendered.contains("In-Person Location: No in-person location for this meeting."));
    assert!(rendered.contains("Meeting URL: No URL for this meeting."));
}

#[rstest]
fn test_reserved_status_uses_booked_wording(mut flow: BookingFlow) {
    let mut with_room = posted(7, (14, 0), (14, 30));
    with_room.physical_location = Some("Room 12".to_string());
    let attempt = submit(&mut flow, vec![with_room], 7, "");

    flow.apply(BookingEvent::ReservationAccepted {
        attempt,
        status: AppointmentStatus::Reserved,
    });

    let rendered = flow.confirmation().unwrap().to_string();
    assert!(rendered.starts_with("Appointment Status: Reserved!"));
    assert!(rendered.contains("successfully booked"));
    assert!(rendered.contains("In-Person Location: Room 12"));
}

#[test_log::test]
fn test_conflict_returns_to_program_selector() {
    let mut flow = flow();
    let attempt = submit(&mut flow, vec![posted(7, (14, 0), (14, 30))], 7, "test");

    let effects = flow.apply(BookingEvent::ReservationConflict { attempt });

    assert_eq!(
        effects,
        vec![BookingEffect::Notify(Notice::Alert(CONFLICT_ALERT.to_string()))]
    );
    assert_eq!(flow.selection().program_id, None);
    assert_eq!(flow.selection().slot, None);
    assert!(!flow.calendar_visible());
    assert!(flow.confirmation().is_none());
    assert_eq!(flow.stage(), BookingStage::ChoosingProgram);
}

#[rstest]
fn test_other_failure_rolls_back_with_generic_alert(mut flow: BookingFlow) {
    let attempt = submit(&mut flow, vec![posted(7, (14, 0), (14, 30))], 7, "");

    let effects = flow.apply(BookingEvent::ReservationFailed {
        attempt,
        reason: "500".to_string(),
    });

    assert_eq!(
        effects,
        vec![BookingEffect::Notify(Notice::Alert(BOOKING_FAILED_ALERT.to_string()))]
    );
    assert_eq!(flow.selection().program_id, None);
    assert!(!flow.calendar_visible());
}

#[rstest]
fn test_late_reservation_after_close_is_ignored(mut flow: BookingFlow) {
    let attempt = submit(&mut flow, vec![posted(7, (14, 0), (14, 30))], 7, "");
    flow.apply(BookingEvent::Closed);

    let effects = flow.apply(BookingEvent::ReservationAccepted {
        attempt,
        status: AppointmentStatus::Reserved,
    });

    assert!(effects.is_empty());
    assert_eq!(flow.stage(), BookingStage::Closed);
    assert!(flow.confirmation().is_none());
    assert_eq!(flow.selection().course_id, None);
}

#[rstest]
fn test_new_booking_clears_everything(mut flow: BookingFlow) {
    let attempt = submit(&mut flow, vec![posted(7, (14, 0), (14, 30))], 7, "");
    flow.apply(BookingEvent::ReservationAccepted {
        attempt,
        status: AppointmentStatus::Reserved,
    });

    flow.apply(BookingEvent::NewBooking);

    assert_eq!(flow.stage(), BookingStage::ChoosingCourse);
    assert!(flow.confirmation().is_none());
    assert_eq!(flow.selection(), &Selection::default());
    assert_eq!(flow.courses().len(), 2);
}

#[rstest]
fn test_midnight_slot_submits_next_day_end(mut flow: BookingFlow) {
    let attempt = with_program(&mut flow);
    flow.apply(BookingEvent::SlotsLoaded {
        attempt,
        slots: vec![posted(9, (23, 30), (0, 0))],
    });
    flow.apply(BookingEvent::SlotChosen(9));

    let effects = flow.apply(BookingEvent::ConfirmPressed);

    let [BookingEffect::Reserve { request, .. }] = effects.as_slice() else {
        panic!("expected a reservation, got {effects:?}");
    };
    assert_eq!(request.reservation.start, "2024-05-02T06:30:00.000Z");
    assert_eq!(request.reservation.end, "2024-05-02T07:00:00.000Z");
    assert_eq!(flow.slot_duration(), Some(30));
}
