use clap::{Parser, Subcommand, ValueEnum};
use scheduler_core::models::appointment::{AppointmentListKind, StatusAction};
use scheduler_core::models::availability::AvailabilityStatus;
use scheduler_core::sorting::SortColumn;

#[derive(Debug, Parser)]
#[command(name = "scheduler")]
#[command(about = "Book and manage Canvas office-hour appointments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List your courses and their appointment-based programs
    Courses,

    /// Show the open slots of a program
    Slots {
        #[arg(long)]
        course: String,

        #[arg(long)]
        program: String,
    },

    /// Reserve a slot
    Book {
        #[arg(long)]
        course: String,

        #[arg(long)]
        program: String,

        /// Id of the slot, as listed by `slots`
        #[arg(long)]
        slot: i64,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List your appointments
    Appointments {
        /// upcoming, pending, past or all
        #[arg(long, default_value = "upcoming")]
        kind: AppointmentListKind,

        /// Column to sort by (name, course, day, date, location, status)
        #[arg(long)]
        sort: Option<SortColumn>,
    },

    /// Approve an appointment or mark it attended or missed
    Status {
        #[arg(long)]
        id: i64,

        /// approve, cancel, attend or miss
        #[arg(long)]
        action: StatusAction,
    },

    /// Cancel an appointment and remove its calendar event
    Cancel {
        #[arg(long)]
        id: i64,
    },

    /// Update notes, meeting URL and location of an appointment
    Edit {
        #[arg(long)]
        id: i64,

        #[arg(long, default_value = "")]
        notes: String,

        #[arg(long, default_value = "")]
        meeting_url: String,

        #[arg(long, default_value = "")]
        location: String,
    },

    /// Rate a past appointment
    Feedback {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        rating: String,

        #[arg(long, default_value = "")]
        comments: String,
    },

    /// List the drop-in times of a course
    Dropins {
        #[arg(long)]
        course: i64,

        #[arg(long)]
        sort: Option<SortColumn>,
    },

    /// List your availability windows for a course
    Availability {
        #[arg(long)]
        course: i64,

        #[arg(long)]
        sort: Option<SortColumn>,
    },

    /// Activate or deactivate an availability window
    AvailabilityStatus {
        #[arg(long)]
        id: i64,

        #[arg(long, value_enum)]
        status: Toggle,
    },

    /// Change the meeting caps of a program
    ProgramLimits {
        #[arg(long)]
        course: i64,

        #[arg(long)]
        program: i64,

        #[arg(long)]
        daily: Option<u32>,

        #[arg(long)]
        weekly: Option<u32>,

        #[arg(long)]
        monthly: Option<u32>,
    },

    /// Show events from the connected calendar
    CalendarEvents,

    /// Print the link that connects your calendar account
    CalendarLogin,
}

impl Command {
    /// Whether the command needs a signed-in session.
    pub fn requires_login(&self) -> bool {
        !matches!(self, Command::CalendarLogin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Active,
    Inactive,
}

impl From<Toggle> for AvailabilityStatus {
    fn from(toggle: Toggle) -> Self {
        match toggle {
            Toggle::Active => AvailabilityStatus::Active,
            Toggle::Inactive => AvailabilityStatus::Inactive,
        }
    }
}
