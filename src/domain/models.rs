use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const UNTITLED_EVENT: &str = "Untitled event";
pub const FALLBACK_BREAK_LABEL: &str = "Break";

/// Start or end of a calendar event: a concrete instant, or a whole day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum EventTime {
    At(DateTime<FixedOffset>),
    AllDay(NaiveDate),
}

impl EventTime {
    /// An instant is upcoming when it is at or after `now`; an all-day value
    /// is upcoming when its date is not before today's date in `time_zone`.
    pub fn is_upcoming(&self, now: DateTime<Utc>, time_zone: Tz) -> bool {
        match self {
            Self::At(instant) => instant.with_timezone(&Utc) >= now,
            Self::AllDay(date) => *date >= now.with_timezone(&time_zone).date_naive(),
        }
    }

    pub fn display(&self, time_zone: Tz) -> String {
        match self {
            Self::At(instant) => format_instant(instant.with_timezone(&Utc), time_zone),
            Self::AllDay(date) => date.format("%a %b %-d, %Y").to_string(),
        }
    }
}

pub fn format_instant(instant: DateTime<Utc>, time_zone: Tz) -> String {
    instant
        .with_timezone(&time_zone)
        .format("%a %b %-d, %Y %-I:%M %p")
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: Option<EventTime>,
}

/// Keeps events whose start is at or after `now`, preserving server order.
pub fn filter_upcoming(
    events: Vec<CalendarEvent>,
    now: DateTime<Utc>,
    time_zone: Tz,
) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .filter(|event| event.start.is_upcoming(now, time_zone))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BreakCategory {
    Recovery,
    FocusSprint,
    Connection,
    Unknown(String),
}

impl BreakCategory {
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        let normalized = trimmed.to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "recovery break" | "recovery" => Self::Recovery,
            "focus sprint" | "focus" => Self::FocusSprint,
            "connection block" | "connection" => Self::Connection,
            "" => Self::Unknown(FALLBACK_BREAK_LABEL.to_string()),
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Recovery => "Recovery Break",
            Self::FocusSprint => "Focus Sprint",
            Self::Connection => "Connection Block",
            Self::Unknown(label) => label,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Recovery => "🌿",
            Self::FocusSprint => "🎯",
            Self::Connection => "💬",
            Self::Unknown(_) => "⏸️",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakSuggestion {
    pub category: BreakCategory,
    pub duration_hours: f64,
    pub hours_from_now: f64,
    pub description: String,
}

impl BreakSuggestion {
    /// Absolute start of the break, anchored at the proposal's generation instant.
    pub fn scheduled_at(&self, generated_at: DateTime<Utc>) -> DateTime<Utc> {
        let millis = (self.hours_from_now * 3_600_000.0).round() as i64;
        TimeDelta::try_milliseconds(millis)
            .and_then(|offset| generated_at.checked_add_signed(offset))
            .unwrap_or(generated_at)
    }
}

/// The last set of suggestions returned by the recommendation service.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalSet {
    pub generated_at: DateTime<Utc>,
    pub suggestions: Vec<BreakSuggestion>,
    /// Set once the suggestions were sent back for scheduling; the calendar
    /// feed is authoritative from then on.
    pub provisional: bool,
}

impl ProposalSet {
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Info,
    Warning,
    Danger,
    Success,
}

impl Tone {
    /// Unknown or empty tone names resolve to `Info`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "warning" => Self::Warning,
            "danger" => Self::Danger,
            "success" => Self::Success,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Success => "success",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Info => "#a29bfe",
            Self::Warning => "#ffb347",
            Self::Danger => "#ff6b6b",
            Self::Success => "#00cec9",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatusState {
    pub message: String,
    pub tone: Tone,
}

impl StatusState {
    pub fn new(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Tone::Info)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(message, Tone::Danger)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Tone::Success)
    }

    /// Empty message at neutral tone.
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_cleared(&self) -> bool {
        self.message.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDraft {
    pub summary: String,
    pub description: String,
    pub hours_from_now: f64,
    pub duration_hours: f64,
}

impl EventDraft {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            hours_from_now: 0.0,
            duration_hours: 1.0,
        }
    }

    /// Trims text fields and replaces non-finite numbers with form defaults.
    pub fn normalized(&self) -> Self {
        Self {
            summary: self.summary.trim().to_string(),
            description: self.description.trim().to_string(),
            hours_from_now: finite_or(self.hours_from_now, 0.0),
            duration_hours: finite_or(self.duration_hours, 1.0),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("Title is required.".to_string());
        }
        if self.duration_hours <= 0.0 {
            return Err("Duration must be positive.".to_string());
        }
        Ok(())
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
