use crate::application::bootstrap::bootstrap_workspace;
use crate::application::break_proposer::{AutoConfirm, Confirm, ProposalOutcome};
use crate::application::controller::{BreakSchedulingController, ControllerSnapshot};
use crate::application::render::{
    feed_markup, feed_text, proposal_markup, proposal_text, status_markup, status_text,
};
use crate::domain::models::{EventDraft, StatusState, Tone};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::wellness_client::WellnessApiClient;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub mod console;
mod session;

pub use console::Console;
pub use session::run_session;

#[derive(Parser, Debug)]
#[command(name = "breaksync", version, about = "Calendar feed and smart break scheduling")]
pub struct Cli {
    /// Workspace directory holding config/ and logs/ (defaults to the current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show upcoming calendar events
    Events,
    /// Smart break suggestions
    Breaks {
        #[command(subcommand)]
        action: BreaksAction,
    },
    /// Create a calendar event
    AddEvent {
        /// Event title
        summary: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Start offset from now, in hours
        #[arg(long, default_value_t = 0.0)]
        hours_from_now: f64,
        /// Duration in hours
        #[arg(long, default_value_t = 1.0)]
        duration_hours: f64,
    },
    /// Delete a calendar event by id
    DeleteEvent {
        id: String,
    },
    /// Interactive session keeping previewed breaks in memory
    Session,
}

#[derive(Subcommand, Debug)]
pub enum BreaksAction {
    /// Generate suggestions without touching the calendar
    Preview,
    /// Generate suggestions, confirm, and add them to the calendar
    Schedule {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

const ASSUME_YES: AutoConfirm = AutoConfirm(true);

/// Which part of the page a command reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Feed,
    Proposal,
    Form,
}

pub async fn run(cli: Cli) -> Result<(), InfraError> {
    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let bootstrap = bootstrap_workspace(&workspace_root)?;
    init_logging(&bootstrap.logs_dir)?;
    tracing::info!(workspace = %bootstrap.workspace_root.display(), "workspace ready");

    let controller = BreakSchedulingController::from_config(&bootstrap.config)?;
    let console = Console::stdio();
    match cli.command {
        Commands::Session => run_session(&controller, &console, cli.format).await,
        command => execute(&controller, command, &console, cli.format).await,
    }
}

pub(crate) async fn execute<C, R, W>(
    controller: &BreakSchedulingController<C>,
    command: Commands,
    console: &Console<R, W>,
    format: OutputFormat,
) -> Result<(), InfraError>
where
    C: WellnessApiClient + 'static,
    R: BufRead + Send,
    W: Write + Send,
{
    match command {
        Commands::Events => {
            controller.refresh_events().await;
            console.print(&render_section(&controller.snapshot(), Section::Feed, format))?;
        }
        Commands::Breaks { action } => {
            preview_and_print(controller, console, format).await?;
            if let BreaksAction::Schedule { yes } = action {
                let confirm: &dyn Confirm = if yes { &ASSUME_YES } else { console };
                schedule_and_print(controller, confirm, console, format).await?;
            }
        }
        Commands::AddEvent {
            summary,
            description,
            hours_from_now,
            duration_hours,
        } => {
            let draft = EventDraft {
                summary,
                description,
                hours_from_now,
                duration_hours,
            };
            controller.add_event(draft).await;
            print_form_result(controller, console, format)?;
        }
        Commands::DeleteEvent { id } => {
            controller.delete_event(&id).await;
            print_form_result(controller, console, format)?;
        }
        Commands::Session => run_session(controller, console, format).await?,
    }
    Ok(())
}

pub(crate) async fn preview_and_print<C, R, W>(
    controller: &BreakSchedulingController<C>,
    console: &Console<R, W>,
    format: OutputFormat,
) -> Result<(), InfraError>
where
    C: WellnessApiClient + 'static,
    R: BufRead + Send,
    W: Write + Send,
{
    controller.preview_breaks().await;
    console.print(&render_section(&controller.snapshot(), Section::Proposal, format))?;
    Ok(())
}

/// Commits the previewed set, then waits for the delayed feed refresh.
pub(crate) async fn schedule_and_print<C, R, W>(
    controller: &BreakSchedulingController<C>,
    confirm: &dyn Confirm,
    console: &Console<R, W>,
    format: OutputFormat,
) -> Result<(), InfraError>
where
    C: WellnessApiClient + 'static,
    R: BufRead + Send,
    W: Write + Send,
{
    match controller.schedule_breaks(confirm).await {
        ProposalOutcome::Scheduled { refresh, .. } | ProposalOutcome::Superseded { refresh, .. } => {
            console.print(&render_status(&controller.snapshot().proposal_status, format))?;
            if let Err(error) = refresh.await {
                tracing::error!(command = "schedule_breaks", %error, "feed refresh task failed");
            }
            console.print(&render_section(&controller.snapshot(), Section::Feed, format))?;
        }
        ProposalOutcome::Declined => console.print("Scheduling cancelled.")?,
        _ => console.print(&render_status(&controller.snapshot().proposal_status, format))?,
    }
    Ok(())
}

fn print_form_result<C, R, W>(
    controller: &BreakSchedulingController<C>,
    console: &Console<R, W>,
    format: OutputFormat,
) -> Result<(), InfraError>
where
    C: WellnessApiClient + 'static,
    R: BufRead + Send,
    W: Write + Send,
{
    let snapshot = controller.snapshot();
    console.print(&render_section(&snapshot, Section::Form, format))?;
    if snapshot.form_status.tone != Tone::Danger {
        console.print(&render_section(&snapshot, Section::Feed, format))?;
    }
    Ok(())
}

pub(crate) fn render_status(state: &StatusState, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => status_text(state).unwrap_or_default(),
        OutputFormat::Html => status_markup(state),
        OutputFormat::Json => serde_json::to_string(state).unwrap_or_default(),
    }
}

pub(crate) fn render_section(
    snapshot: &ControllerSnapshot,
    section: Section,
    format: OutputFormat,
) -> String {
    let status = match section {
        Section::Feed => &snapshot.feed_status,
        Section::Proposal => &snapshot.proposal_status,
        Section::Form => &snapshot.form_status,
    };
    let body = match (section, format) {
        (_, OutputFormat::Json) => return json_section(snapshot, section),
        (Section::Feed, OutputFormat::Text) => feed_text(&snapshot.feed),
        (Section::Feed, OutputFormat::Html) => feed_markup(&snapshot.feed),
        (Section::Proposal, OutputFormat::Text) => proposal_text(&snapshot.proposal),
        (Section::Proposal, OutputFormat::Html) => proposal_markup(&snapshot.proposal),
        (Section::Form, _) => String::new(),
    };
    [render_status(status, format), body]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_section(snapshot: &ControllerSnapshot, section: Section) -> String {
    let value = match section {
        Section::Feed => serde_json::json!({
            "status": snapshot.feed_status,
            "view": snapshot.feed,
        }),
        Section::Proposal => serde_json::json!({
            "status": snapshot.proposal_status,
            "view": snapshot.proposal,
        }),
        Section::Form => serde_json::json!({ "status": snapshot.form_status }),
    };
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
