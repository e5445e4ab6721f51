use crate::domain::models::{
    BreakCategory, BreakSuggestion, CalendarEvent, EventDraft, EventTime, UNTITLED_EVENT,
};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

const DEFAULT_DURATION_HOURS: f64 = 1.0;
const DEFAULT_HOURS_FROM_NOW: f64 = 1.0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Event object as served by `GET /api/events`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct WireCalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarEventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarEventDateTime>,
}

#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct AddEventRequest<'a> {
    pub summary: &'a str,
    pub description: &'a str,
    pub hours_from_now: f64,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Copy, serde::Serialize, PartialEq, Eq)]
pub struct SmartBreaksRequest {
    pub auto_schedule: bool,
}

/// Decoded `POST /api/smart-breaks` success body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SmartBreaksPayload {
    pub suggestions: Vec<BreakSuggestion>,
    pub scheduled_count: u32,
}

pub fn encode_event_draft(draft: &EventDraft) -> AddEventRequest<'_> {
    AddEventRequest {
        summary: &draft.summary,
        description: &draft.description,
        hours_from_now: draft.hours_from_now,
        duration_hours: draft.duration_hours,
    }
}

/// Returns `None` when the event has no resolvable start.
pub fn decode_calendar_event(event: &WireCalendarEvent) -> Option<CalendarEvent> {
    let start = event.start.as_ref().and_then(decode_event_time)?;
    let end = event.end.as_ref().and_then(decode_event_time);

    let summary = non_blank(event.summary.as_deref())
        .unwrap_or(UNTITLED_EVENT)
        .to_string();

    Some(CalendarEvent {
        id: non_blank(event.id.as_deref()).map(ToOwned::to_owned),
        summary,
        description: non_blank(event.description.as_deref()).map(ToOwned::to_owned),
        start,
        end,
    })
}

/// Non-array bodies decode to an empty list; malformed entries are skipped.
pub fn decode_event_list(body: Value) -> Vec<CalendarEvent> {
    let Value::Array(items) = body else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<WireCalendarEvent>(item) {
            Ok(event) => {
                let decoded = decode_calendar_event(&event);
                if decoded.is_none() {
                    tracing::debug!(event_id = ?event.id, "dropping event without resolvable start");
                }
                decoded
            }
            Err(error) => {
                tracing::warn!(%error, "skipping malformed calendar event");
                None
            }
        })
        .collect()
}

pub fn decode_smart_breaks(body: &Value) -> SmartBreaksPayload {
    let suggestions = body
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(decode_break_suggestion).collect())
        .unwrap_or_default();

    let scheduled_count = body
        .get("scheduled_count")
        .and_then(coerce_f64)
        .filter(|count| *count >= 0.0)
        .map(|count| count.min(u32::MAX as f64) as u32)
        .unwrap_or(0);

    SmartBreaksPayload {
        suggestions,
        scheduled_count,
    }
}

pub fn decode_break_suggestion(item: &Value) -> Option<BreakSuggestion> {
    let Some(object) = item.as_object() else {
        tracing::warn!("skipping break suggestion that is not an object");
        return None;
    };

    let label = object.get("type").and_then(coerce_text).unwrap_or_default();
    let duration_hours = object
        .get("duration_hours")
        .and_then(coerce_f64)
        .filter(|value| *value > 0.0)
        .unwrap_or(DEFAULT_DURATION_HOURS);
    let hours_from_now = object
        .get("hours_from_now")
        .and_then(coerce_f64)
        .unwrap_or(DEFAULT_HOURS_FROM_NOW);
    let description = object
        .get("description")
        .and_then(coerce_text)
        .unwrap_or_default();

    Some(BreakSuggestion {
        category: BreakCategory::from_label(&label),
        duration_hours,
        hours_from_now,
        description,
    })
}

/// `{ "error": "..." }` message, when the body carries a non-blank one.
pub fn decode_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

fn decode_event_time(value: &CalendarEventDateTime) -> Option<EventTime> {
    if let Some(instant) = non_blank(value.date_time.as_deref())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    {
        return Some(EventTime::At(instant));
    }
    non_blank(value.date.as_deref())
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .map(EventTime::AllDay)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
