//! Command-line front end of the meeting scheduler.

use eyre::Result;
use scheduler_client::AppState;
use scheduler_core::models::appointment::AppointmentUpdate;
use tracing::{debug, info};

pub mod commands;
pub mod config;
pub mod handlers;
pub mod render;

use commands::{Cli, Command};
use config::CliConfig;

/// Runs one command, signing in first and out afterwards when it needs a session.
pub async fn run(cli: Cli, state: AppState, config: &CliConfig) -> Result<()> {
    if !cli.command.requires_login() {
        return execute(cli.command, &state).await;
    }

    let (email, password) = config.credentials()?;
    let profile = state.login(email, password).await?;
    info!(user = %profile.name, account_type = ?profile.account_type, "Session started");

    let result = execute(cli.command, &state).await;
    if let Err(err) = state.logout().await {
        debug!(error = %err, "Logout failed");
    }
    result
}

async fn execute(command: Command, state: &AppState) -> Result<()> {
    match command {
        Command::Courses => handlers::courses(state).await,
        Command::Slots { course, program } => handlers::slots(state, &course, &program).await,
        Command::Book {
            course,
            program,
            slot,
            notes,
        } => handlers::book(state, &course, &program, slot, &notes).await,
        Command::Appointments { kind, sort } => handlers::list_appointments(state, kind, sort).await,
        Command::Status { id, action } => handlers::change_status(state, id, action).await,
        Command::Cancel { id } => handlers::cancel(state, id).await,
        Command::Edit {
            id,
            notes,
            meeting_url,
            location,
        } => {
            let update = AppointmentUpdate {
                notes,
                meeting_url,
                location,
            };
            handlers::edit(state, id, update).await
        }
        Command::Feedback {
            id,
            rating,
            comments,
        } => handlers::feedback(state, id, &rating, &comments).await,
        Command::Dropins { course, sort } => handlers::drop_ins(state, course, sort).await,
        Command::Availability { course, sort } => handlers::availability(state, course, sort).await,
        Command::AvailabilityStatus { id, status } => {
            handlers::availability_status(state, id, status.into()).await
        }
        Command::ProgramLimits {
            course,
            program,
            daily,
            weekly,
            monthly,
        } => handlers::program_limits(state, course, program, daily, weekly, monthly).await,
        Command::CalendarEvents => handlers::calendar_events(state).await,
        Command::CalendarLogin => {
            handlers::calendar_login(state);
            Ok(())
        }
    }
}
