use crate::application::break_proposer::{BreakProposer, Confirm, ProposalOutcome, ProposalView};
use crate::application::event_feed::{EventFeed, FeedView, NowProvider, RefreshOutcome};
use crate::application::event_form::{EventForm, FormOutcome};
use crate::application::status::{present, StatusDisplay};
use crate::domain::models::{EventDraft, StatusState};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::wellness_client::{ReqwestWellnessApiClient, WellnessApiClient};
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Everything a surface needs to draw the page at one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControllerSnapshot {
    pub feed: FeedView,
    pub feed_status: StatusState,
    pub proposal: ProposalView,
    pub proposal_status: StatusState,
    pub form_status: StatusState,
}

impl ControllerSnapshot {
    pub fn status_displays(&self) -> [StatusDisplay; 3] {
        [
            present(&self.feed_status),
            present(&self.proposal_status),
            present(&self.form_status),
        ]
    }
}

/// Owns the event feed, break proposer and event form over one API client.
pub struct BreakSchedulingController<C>
where
    C: WellnessApiClient + 'static,
{
    feed: Arc<EventFeed<C>>,
    proposer: BreakProposer<C>,
    form: EventForm<C>,
}

impl BreakSchedulingController<ReqwestWellnessApiClient> {
    pub fn from_config(config: &AppConfig) -> Result<Self, InfraError> {
        let client = ReqwestWellnessApiClient::new(
            config.base_url.clone(),
            config.session_cookie.clone(),
        )?;
        tracing::info!(
            base_url = %config.base_url,
            timezone = %config.timezone,
            refresh_delay_ms = config.refresh_delay.as_millis() as u64,
            "controller configured"
        );
        Ok(Self::new(Arc::new(client), config.timezone, config.refresh_delay))
    }
}

impl<C> BreakSchedulingController<C>
where
    C: WellnessApiClient + 'static,
{
    pub fn new(client: Arc<C>, time_zone: Tz, refresh_delay: Duration) -> Self {
        Self::with_now_provider(client, time_zone, refresh_delay, Arc::new(Utc::now))
    }

    pub fn with_now_provider(
        client: Arc<C>,
        time_zone: Tz,
        refresh_delay: Duration,
        now_provider: NowProvider,
    ) -> Self {
        let feed = Arc::new(
            EventFeed::new(Arc::clone(&client), time_zone)
                .with_now_provider(Arc::clone(&now_provider)),
        );
        let proposer = BreakProposer::new(
            Arc::clone(&client),
            Arc::clone(&feed),
            time_zone,
            refresh_delay,
        )
        .with_now_provider(now_provider);
        let form = EventForm::new(client, Arc::clone(&feed));

        Self {
            feed,
            proposer,
            form,
        }
    }

    /// Initial page load: populates the agenda.
    pub async fn load(&self) -> RefreshOutcome {
        tracing::debug!(command = "load", "loading controller");
        self.refresh_events().await
    }

    pub async fn refresh_events(&self) -> RefreshOutcome {
        self.feed.refresh().await
    }

    pub async fn preview_breaks(&self) -> ProposalOutcome {
        self.proposer.preview().await
    }

    pub async fn schedule_breaks(&self, confirm: &dyn Confirm) -> ProposalOutcome {
        self.proposer.schedule(confirm).await
    }

    pub async fn add_event(&self, draft: EventDraft) -> FormOutcome {
        self.form.submit(draft).await
    }

    pub async fn delete_event(&self, event_id: &str) -> FormOutcome {
        self.form.delete(event_id).await
    }

    pub fn pending_breaks(&self) -> usize {
        self.proposer.pending_count()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            feed: self.feed.view(),
            feed_status: self.feed.status(),
            proposal: self.proposer.view(),
            proposal_status: self.proposer.status(),
            form_status: self.form.status(),
        }
    }
}
