use crate::domain::models::{
    BreakCategory, BreakSuggestion, CalendarEvent, EventDraft, EventTime,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::SmartBreaksPayload;
use crate::infrastructure::wellness_client::WellnessApiClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

pub(crate) struct FakeCall<T> {
    pub delay_ms: u64,
    pub result: Result<T, InfraError>,
}

impl<T> FakeCall<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay_ms: 0,
            result: Ok(value),
        }
    }

    pub fn err(error: InfraError) -> Self {
        Self {
            delay_ms: 0,
            result: Err(error),
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

#[derive(Default)]
pub(crate) struct FakeWellnessApiClient {
    events: Mutex<VecDeque<FakeCall<Vec<CalendarEvent>>>>,
    breaks: Mutex<VecDeque<FakeCall<SmartBreaksPayload>>>,
    writes: Mutex<VecDeque<FakeCall<()>>>,
    pub list_calls: AtomicUsize,
    pub break_flags: Mutex<Vec<bool>>,
    pub added: Mutex<Vec<EventDraft>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeWellnessApiClient {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_events(&self, call: FakeCall<Vec<CalendarEvent>>) {
        self.events.lock().expect("events lock").push_back(call);
    }

    pub fn push_breaks(&self, call: FakeCall<SmartBreaksPayload>) {
        self.breaks.lock().expect("breaks lock").push_back(call);
    }

    pub fn push_write(&self, call: FakeCall<()>) {
        self.writes.lock().expect("writes lock").push_back(call);
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn break_flags(&self) -> Vec<bool> {
        self.break_flags.lock().expect("flags lock").clone()
    }

    async fn resolve<T>(queue: &Mutex<VecDeque<FakeCall<T>>>, default: T) -> Result<T, InfraError> {
        let call = queue
            .lock()
            .expect("fake queue lock")
            .pop_front()
            .unwrap_or_else(|| FakeCall::ok(default));
        if call.delay_ms > 0 {
            sleep(Duration::from_millis(call.delay_ms)).await;
        }
        call.result
    }
}

#[async_trait]
impl WellnessApiClient for FakeWellnessApiClient {
    async fn list_events(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::resolve(&self.events, Vec::new()).await
    }

    async fn add_event(&self, draft: &EventDraft) -> Result<(), InfraError> {
        self.added.lock().expect("added lock").push(draft.clone());
        Self::resolve(&self.writes, ()).await
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), InfraError> {
        self.deleted.lock().expect("deleted lock").push(event_id.to_string());
        Self::resolve(&self.writes, ()).await
    }

    async fn smart_breaks(&self, auto_schedule: bool) -> Result<SmartBreaksPayload, InfraError> {
        self.break_flags.lock().expect("flags lock").push(auto_schedule);
        Self::resolve(&self.breaks, SmartBreaksPayload::default()).await
    }
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-16T12:00:00Z")
        .expect("valid datetime")
        .with_timezone(&Utc)
}

pub(crate) fn event_at(summary: &str, start: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: Some(format!("evt-{summary}")),
        summary: summary.to_string(),
        description: None,
        start: EventTime::At(start.fixed_offset()),
        end: None,
    }
}

pub(crate) fn event_in_hours(summary: &str, hours: i64) -> CalendarEvent {
    event_at(summary, fixed_now() + TimeDelta::hours(hours))
}

pub(crate) fn suggestion(label: &str, hours_from_now: f64, description: &str) -> BreakSuggestion {
    BreakSuggestion {
        category: BreakCategory::from_label(label),
        duration_hours: 0.5,
        hours_from_now,
        description: description.to_string(),
    }
}

pub(crate) fn payload(suggestions: Vec<BreakSuggestion>, scheduled_count: u32) -> SmartBreaksPayload {
    SmartBreaksPayload {
        suggestions,
        scheduled_count,
    }
}
