use crate::application::event_feed::{EventFeed, RefreshOutcome};
use crate::application::request_token::{RequestSequencer, RequestToken};
use crate::application::status::{report_failure, FailureMessages};
use crate::domain::models::{EventDraft, StatusState};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::wellness_client::WellnessApiClient;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SUBMITTING_MESSAGE: &str = "Creating event…";
pub const DELETING_MESSAGE: &str = "Removing event…";
pub const CREATED_MESSAGE: &str = "Event scheduled! Refresh to see it below.";
pub const DELETED_MESSAGE: &str = "Event removed.";
pub const MISSING_ID_MESSAGE: &str = "Event id is required.";

const CREATE_FAILURES: FailureMessages = FailureMessages {
    fallback: "Unable to create event",
    login: "Please log in to add events.",
    transport: "Could not reach the calendar service. Please try again.",
};

const DELETE_FAILURES: FailureMessages = FailureMessages {
    fallback: "Unable to delete event",
    login: "Please log in to add events.",
    transport: "Could not reach the calendar service. Please try again.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Created { refresh: RefreshOutcome },
    Deleted { refresh: RefreshOutcome },
    /// Input failed local validation; nothing was sent.
    Rejected,
    Failed,
    Stale,
}

/// Single-event create/delete surface with its own form status.
pub struct EventForm<C>
where
    C: WellnessApiClient,
{
    client: Arc<C>,
    feed: Arc<EventFeed<C>>,
    sequencer: RequestSequencer,
    status: Mutex<StatusState>,
}

impl<C> EventForm<C>
where
    C: WellnessApiClient,
{
    pub fn new(client: Arc<C>, feed: Arc<EventFeed<C>>) -> Self {
        Self {
            client,
            feed,
            sequencer: RequestSequencer::default(),
            status: Mutex::new(StatusState::default()),
        }
    }

    pub fn status(&self) -> StatusState {
        self.lock_status().clone()
    }

    pub async fn submit(&self, draft: EventDraft) -> FormOutcome {
        let draft = draft.normalized();
        if let Err(message) = draft.validate() {
            *self.lock_status() = StatusState::danger(message);
            tracing::debug!(command = "add_event", "draft rejected");
            return FormOutcome::Rejected;
        }

        let token = {
            let mut status = self.lock_status();
            *status = StatusState::info(SUBMITTING_MESSAGE);
            self.sequencer.issue()
        };
        let result = self.client.add_event(&draft).await;

        if let Some(outcome) =
            self.settle(token, "add_event", result, &CREATE_FAILURES, CREATED_MESSAGE)
        {
            return outcome;
        }
        tracing::info!(command = "add_event", summary = %draft.summary, "event created");
        FormOutcome::Created {
            refresh: self.feed.refresh().await,
        }
    }

    pub async fn delete(&self, event_id: &str) -> FormOutcome {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            *self.lock_status() = StatusState::danger(MISSING_ID_MESSAGE);
            return FormOutcome::Rejected;
        }

        let token = {
            let mut status = self.lock_status();
            *status = StatusState::info(DELETING_MESSAGE);
            self.sequencer.issue()
        };
        let result = self.client.delete_event(event_id).await;

        if let Some(outcome) =
            self.settle(token, "delete_event", result, &DELETE_FAILURES, DELETED_MESSAGE)
        {
            return outcome;
        }
        tracing::info!(command = "delete_event", event_id, "event deleted");
        FormOutcome::Deleted {
            refresh: self.feed.refresh().await,
        }
    }

    /// Applies a completion to the form status; returns the terminal outcome
    /// unless the write succeeded and the feed should be refreshed.
    fn settle(
        &self,
        token: RequestToken,
        command: &str,
        result: Result<(), InfraError>,
        messages: &FailureMessages,
        success: &str,
    ) -> Option<FormOutcome> {
        let mut status = self.lock_status();
        if !self.sequencer.is_current(token) {
            tracing::debug!(command, token = token.value(), "dropping stale response");
            return Some(FormOutcome::Stale);
        }
        match result {
            Ok(()) => {
                *status = StatusState::success(success);
                None
            }
            Err(error) => {
                let message = report_failure(command, &error, messages);
                *status = StatusState::danger(match error {
                    InfraError::AuthenticationRequired => message,
                    _ => format!("Error: {message}"),
                });
                Some(FormOutcome::Failed)
            }
        }
    }

    fn lock_status(&self) -> MutexGuard<'_, StatusState> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
