use crate::application::controller::BreakSchedulingController;
use crate::cli::console::Console;
use crate::cli::{
    preview_and_print, render_section, render_status, schedule_and_print, OutputFormat, Section,
};
use crate::domain::models::EventDraft;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::wellness_client::WellnessApiClient;
use std::io::{BufRead, Write};

const PROMPT: &str = "breaksync> ";
const HELP: &str = "Commands:
  events          refresh and show upcoming events
  preview         generate smart break suggestions
  schedule        add the previewed suggestions to your calendar
  add             create an event (prompts for details)
  delete <id>     remove an event
  status          show all status lines
  help            show this help
  quit            leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Events,
    Preview,
    Schedule,
    Add,
    Delete(String),
    Status,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

impl SessionCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map(|(head, rest)| (head, rest.trim()))
            .unwrap_or((line, ""));
        match head.to_ascii_lowercase().as_str() {
            "" => Self::Blank,
            "events" | "refresh" => Self::Events,
            "preview" => Self::Preview,
            "schedule" => Self::Schedule,
            "add" => Self::Add,
            "delete" => Self::Delete(rest.to_string()),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(head.to_string()),
        }
    }
}

/// Line-driven loop over one controller, so a preview stays available to schedule.
pub async fn run_session<C, R, W>(
    controller: &BreakSchedulingController<C>,
    console: &Console<R, W>,
    format: OutputFormat,
) -> Result<(), InfraError>
where
    C: WellnessApiClient + 'static,
    R: BufRead + Send,
    W: Write + Send,
{
    tracing::info!(command = "session", "interactive session started");
    controller.load().await;
    console.print(&render_section(&controller.snapshot(), Section::Feed, format))?;
    console.print("Type 'help' for commands.")?;

    while let Some(line) = console.read_line(PROMPT)? {
        match SessionCommand::parse(&line) {
            SessionCommand::Blank => {}
            SessionCommand::Events => {
                controller.refresh_events().await;
                console.print(&render_section(&controller.snapshot(), Section::Feed, format))?;
            }
            SessionCommand::Preview => preview_and_print(controller, console, format).await?,
            SessionCommand::Schedule => {
                schedule_and_print(controller, console, console, format).await?
            }
            SessionCommand::Add => {
                let Some(draft) = read_draft(console)? else {
                    break;
                };
                controller.add_event(draft).await;
                print_form(controller, console, format)?;
            }
            SessionCommand::Delete(event_id) => {
                controller.delete_event(&event_id).await;
                print_form(controller, console, format)?;
            }
            SessionCommand::Status => {
                let snapshot = controller.snapshot();
                for status in [
                    &snapshot.feed_status,
                    &snapshot.proposal_status,
                    &snapshot.form_status,
                ] {
                    console.print(&render_status(status, format))?;
                }
            }
            SessionCommand::Help => console.print(HELP)?,
            SessionCommand::Quit => break,
            SessionCommand::Unknown(command) => {
                console.print(&format!("Unknown command '{command}'. Type 'help' for commands."))?
            }
        }
    }

    tracing::info!(command = "session", "interactive session ended");
    Ok(())
}

fn print_form<C, R, W>(
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
    Ok(())
}

/// Prompts for the event fields; `None` at end of input.
fn read_draft<R, W>(console: &Console<R, W>) -> Result<Option<EventDraft>, InfraError>
where
    R: BufRead + Send,
    W: Write + Send,
{
    let Some(summary) = console.read_line("Title: ")? else {
        return Ok(None);
    };
    let Some(description) = console.read_line("Description: ")? else {
        return Ok(None);
    };
    let Some(hours_from_now) = console.read_line("Starts in (hours) [0]: ")? else {
        return Ok(None);
    };
    let Some(duration_hours) = console.read_line("Duration (hours) [1]: ")? else {
        return Ok(None);
    };

    Ok(Some(EventDraft {
        summary,
        description,
        hours_from_now: parse_number(&hours_from_now),
        duration_hours: parse_number(&duration_hours),
    }))
}

/// Blank or unparseable input becomes NaN, which the draft normalizes to its default.
fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}
