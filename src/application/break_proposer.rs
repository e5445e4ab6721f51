use crate::application::event_feed::{EventFeed, NowProvider, RefreshOutcome};
use crate::application::request_token::{RequestSequencer, RequestToken};
use crate::application::status::{report_failure, FailureMessages};
use crate::domain::models::{
    format_instant, BreakCategory, BreakSuggestion, ProposalSet, StatusState,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::SmartBreaksPayload;
use crate::infrastructure::wellness_client::WellnessApiClient;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const PREVIEW_MESSAGE: &str = "Generating smart breaks...";
pub const SCHEDULE_MESSAGE: &str = "Scheduling breaks to your calendar...";
pub const ANALYZING_MESSAGE: &str = "Analyzing your calendar and stress patterns...";
pub const NO_PROPOSAL_MESSAGE: &str = "Please generate breaks first before scheduling.";
pub const EMPTY_PROPOSAL_MESSAGE: &str =
    "No break suggestions available. Try recording a vent or completing the stress check first.";

const BREAK_FAILURES: FailureMessages = FailureMessages {
    fallback: "Failed to generate breaks. Please try again.",
    login: "Please log in to generate smart breaks.",
    transport: "Could not reach the break service. Please try again.",
};

/// User acknowledgement required before suggestions are written to the calendar.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed answer, for non-interactive callers.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

pub fn schedule_prompt(count: usize) -> String {
    format!("This will add {count} smart breaks to your calendar. Continue?")
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BreakCard {
    pub category: BreakCategory,
    pub label: String,
    pub glyph: &'static str,
    pub duration_hours: f64,
    pub scheduled_at: DateTime<Utc>,
    pub display_time: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "snake_case", tag = "state", content = "content")]
pub enum ProposalView {
    #[default]
    Idle,
    Loading(String),
    Empty,
    Error(String),
    Suggestions(Vec<BreakCard>),
}

#[derive(Debug)]
pub enum ProposalOutcome {
    Previewed { count: usize },
    /// The service returned no suggestions.
    Empty,
    Scheduled {
        scheduled_count: u32,
        refresh: JoinHandle<RefreshOutcome>,
    },
    /// Schedule was requested without a non-empty preview in memory.
    Refused,
    Declined,
    Failed,
    Stale,
    /// The server wrote the breaks, but a newer request owns the view; only
    /// the feed refresh still runs.
    Superseded {
        scheduled_count: u32,
        refresh: JoinHandle<RefreshOutcome>,
    },
}

#[derive(Debug, Default)]
struct ProposerState {
    view: ProposalView,
    status: StatusState,
    proposal: Option<ProposalSet>,
}

/// Preview/commit workflow for suggested breaks.
///
/// Holds the last proposal set; schedule mode reads it and, after a
/// successful commit, triggers a delayed feed refresh.
pub struct BreakProposer<C>
where
    C: WellnessApiClient + 'static,
{
    client: Arc<C>,
    feed: Arc<EventFeed<C>>,
    time_zone: Tz,
    refresh_delay: Duration,
    now_provider: NowProvider,
    sequencer: RequestSequencer,
    state: Mutex<ProposerState>,
}

impl<C> BreakProposer<C>
where
    C: WellnessApiClient + 'static,
{
    pub fn new(client: Arc<C>, feed: Arc<EventFeed<C>>, time_zone: Tz, refresh_delay: Duration) -> Self {
        Self {
            client,
            feed,
            time_zone,
            refresh_delay,
            now_provider: Arc::new(Utc::now),
            sequencer: RequestSequencer::default(),
            state: Mutex::new(ProposerState::default()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn view(&self) -> ProposalView {
        self.lock_state().view.clone()
    }

    pub fn status(&self) -> StatusState {
        self.lock_state().status.clone()
    }

    /// Number of suggestions a schedule request would cover.
    pub fn pending_count(&self) -> usize {
        self.lock_state()
            .proposal
            .as_ref()
            .map(ProposalSet::len)
            .unwrap_or(0)
    }

    pub fn proposal(&self) -> Option<ProposalSet> {
        self.lock_state().proposal.clone()
    }

    pub async fn preview(&self) -> ProposalOutcome {
        let token = self.begin(PREVIEW_MESSAGE);
        let result = self.client.smart_breaks(false).await;
        let generated_at = (self.now_provider)();

        let mut state = self.lock_state();
        let payload = match self.settle(&mut state, token, "preview_breaks", result) {
            Ok(payload) => payload,
            Err(outcome) => return outcome,
        };

        let count = payload.suggestions.len();
        self.replace_proposal(&mut state, payload.suggestions, generated_at, false);
        if count == 0 {
            state.status = StatusState::cleared();
            tracing::info!(command = "preview_breaks", "no suggestions returned");
            return ProposalOutcome::Empty;
        }

        state.status = StatusState::success(format!(
            "Generated {count} smart breaks. Run schedule to add them to your calendar."
        ));
        tracing::info!(command = "preview_breaks", count, "break suggestions generated");
        ProposalOutcome::Previewed { count }
    }

    pub async fn schedule(&self, confirm: &dyn Confirm) -> ProposalOutcome {
        let pending = self
            .lock_state()
            .proposal
            .as_ref()
            .filter(|proposal| !proposal.is_empty())
            .map(ProposalSet::len);
        let Some(pending) = pending else {
            self.lock_state().status = StatusState::danger(NO_PROPOSAL_MESSAGE);
            tracing::warn!(command = "schedule_breaks", "refused: no previewed suggestions");
            return ProposalOutcome::Refused;
        };

        if !confirm.confirm(&schedule_prompt(pending)) {
            tracing::info!(command = "schedule_breaks", pending, "scheduling declined");
            return ProposalOutcome::Declined;
        }

        let token = self.begin(SCHEDULE_MESSAGE);
        let result = self.client.smart_breaks(true).await;
        let generated_at = (self.now_provider)();

        let scheduled_count = {
            let mut state = self.lock_state();
            let result = match result {
                Ok(payload) if !self.sequencer.is_current(token) => {
                    tracing::info!(
                        command = "schedule_breaks",
                        token = token.value(),
                        scheduled_count = payload.scheduled_count,
                        "breaks scheduled under a newer request; refreshing feed only"
                    );
                    return ProposalOutcome::Superseded {
                        scheduled_count: payload.scheduled_count,
                        refresh: self.spawn_feed_refresh(),
                    };
                }
                result => result,
            };
            let payload = match self.settle(&mut state, token, "schedule_breaks", result) {
                Ok(payload) => payload,
                Err(outcome) => return outcome,
            };

            let scheduled_count = payload.scheduled_count;
            self.replace_proposal(&mut state, payload.suggestions, generated_at, true);
            state.status = StatusState::success(format!(
                "Successfully added {scheduled_count} breaks to your calendar!"
            ));
            tracing::info!(
                command = "schedule_breaks",
                pending,
                scheduled_count,
                "breaks scheduled"
            );
            scheduled_count
        };

        ProposalOutcome::Scheduled {
            scheduled_count,
            refresh: self.spawn_feed_refresh(),
        }
    }

    fn begin(&self, message: &str) -> RequestToken {
        let mut state = self.lock_state();
        state.status = StatusState::info(message);
        state.view = ProposalView::Loading(ANALYZING_MESSAGE.to_string());
        self.sequencer.issue()
    }

    /// Drops stale completions and applies failures; the proposal set is
    /// only touched by the caller on success.
    fn settle(
        &self,
        state: &mut ProposerState,
        token: RequestToken,
        command: &str,
        result: Result<SmartBreaksPayload, InfraError>,
    ) -> Result<SmartBreaksPayload, ProposalOutcome> {
        if !self.sequencer.is_current(token) {
            tracing::debug!(command, token = token.value(), "dropping stale response");
            return Err(ProposalOutcome::Stale);
        }
        result.map_err(|error| {
            let message = report_failure(command, &error, &BREAK_FAILURES);
            state.view = ProposalView::Error(message.clone());
            state.status = StatusState::danger(message);
            ProposalOutcome::Failed
        })
    }

    fn replace_proposal(
        &self,
        state: &mut ProposerState,
        suggestions: Vec<BreakSuggestion>,
        generated_at: DateTime<Utc>,
        provisional: bool,
    ) {
        state.view = if suggestions.is_empty() {
            ProposalView::Empty
        } else {
            ProposalView::Suggestions(
                suggestions
                    .iter()
                    .map(|suggestion| self.to_card(suggestion, generated_at))
                    .collect(),
            )
        };
        state.proposal = Some(ProposalSet {
            generated_at,
            suggestions,
            provisional,
        });
    }

    fn to_card(&self, suggestion: &BreakSuggestion, generated_at: DateTime<Utc>) -> BreakCard {
        let scheduled_at = suggestion.scheduled_at(generated_at);
        BreakCard {
            category: suggestion.category.clone(),
            label: suggestion.category.label().to_string(),
            glyph: suggestion.category.glyph(),
            duration_hours: suggestion.duration_hours,
            scheduled_at,
            display_time: format_instant(scheduled_at, self.time_zone),
            description: suggestion.description.clone(),
        }
    }

    fn spawn_feed_refresh(&self) -> JoinHandle<RefreshOutcome> {
        let feed = Arc::clone(&self.feed);
        let delay = self.refresh_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            feed.refresh().await
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ProposerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        event_in_hours, fixed_now, payload, suggestion, FakeCall, FakeWellnessApiClient,
    };
    use crate::domain::models::Tone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConfirm {
        answer: bool,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl CountingConfirm {
        fn answering(answer: bool) -> Self {
            Self {
                answer,
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Confirm for CountingConfirm {
        fn confirm(&self, prompt: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("prompts lock").push(prompt.to_string());
            self.answer
        }
    }

    fn proposer(client: Arc<FakeWellnessApiClient>) -> BreakProposer<FakeWellnessApiClient> {
        let feed = Arc::new(
            EventFeed::new(Arc::clone(&client), Tz::UTC).with_now_provider(Arc::new(fixed_now)),
        );
        BreakProposer::new(client, feed, Tz::UTC, Duration::from_millis(20))
            .with_now_provider(Arc::new(fixed_now))
    }

    fn three_suggestions() -> Vec<BreakSuggestion> {
        vec![
            suggestion("Recovery Break", 1.5, "Step away from the screen"),
            suggestion("Focus Sprint", 3.0, "Deep work block"),
            suggestion("Connection Block", 5.0, "Call a friend"),
        ]
    }

    #[tokio::test]
    async fn preview_then_schedule_updates_status_and_refreshes_later() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 3)));
        client.push_events(FakeCall::ok(vec![event_in_hours("Recovery Break", 2)]));
        let proposer = proposer(Arc::clone(&client));

        let outcome = proposer.preview().await;
        assert!(matches!(outcome, ProposalOutcome::Previewed { count: 3 }));
        assert_eq!(
            proposer.status(),
            StatusState::success(
                "Generated 3 smart breaks. Run schedule to add them to your calendar."
            )
        );
        let ProposalView::Suggestions(cards) = proposer.view() else {
            panic!("expected suggestions view");
        };
        assert_eq!(cards[0].label, "Recovery Break");
        assert_eq!(cards[0].glyph, "🌿");
        assert_eq!(cards[0].display_time, "Mon Feb 16, 2026 1:30 PM");

        let confirm = CountingConfirm::answering(true);
        let ProposalOutcome::Scheduled { scheduled_count, refresh } =
            proposer.schedule(&confirm).await
        else {
            panic!("expected scheduled outcome");
        };
        assert_eq!(scheduled_count, 3);
        assert_eq!(
            confirm.prompts.lock().expect("prompts lock").as_slice(),
            ["This will add 3 smart breaks to your calendar. Continue?".to_string()]
        );
        assert_eq!(
            proposer.status(),
            StatusState::success("Successfully added 3 breaks to your calendar!")
        );
        assert_eq!(client.break_flags(), vec![false, true]);
        assert_eq!(client.list_count(), 0);
        assert!(proposer.proposal().expect("proposal").provisional);

        let refreshed = refresh.await.expect("refresh task");
        assert_eq!(refreshed, RefreshOutcome::Loaded { shown: 1, hidden: 0 });
        assert_eq!(client.list_count(), 1);
    }

    #[tokio::test]
    async fn schedule_without_preview_is_refused_before_any_call() {
        let client = FakeWellnessApiClient::shared();
        let proposer = proposer(Arc::clone(&client));
        let confirm = CountingConfirm::answering(true);

        assert!(matches!(proposer.schedule(&confirm).await, ProposalOutcome::Refused));
        assert_eq!(proposer.status(), StatusState::danger(NO_PROPOSAL_MESSAGE));
        assert_eq!(confirm.calls.load(Ordering::SeqCst), 0);
        assert!(client.break_flags().is_empty());
    }

    #[tokio::test]
    async fn schedule_after_empty_preview_is_refused() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(Vec::new(), 0)));
        let proposer = proposer(Arc::clone(&client));

        assert!(matches!(proposer.preview().await, ProposalOutcome::Empty));
        assert_eq!(proposer.view(), ProposalView::Empty);
        assert!(proposer.status().is_cleared());

        let outcome = proposer.schedule(&AutoConfirm(true)).await;
        assert!(matches!(outcome, ProposalOutcome::Refused));
        assert_eq!(client.break_flags(), vec![false]);
    }

    #[tokio::test]
    async fn declined_confirmation_changes_nothing() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        let proposer = proposer(Arc::clone(&client));
        proposer.preview().await;
        let status_before = proposer.status();
        let proposal_before = proposer.proposal();

        let confirm = CountingConfirm::answering(false);
        assert!(matches!(proposer.schedule(&confirm).await, ProposalOutcome::Declined));

        assert_eq!(confirm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.break_flags(), vec![false]);
        assert_eq!(proposer.status(), status_before);
        assert_eq!(proposer.proposal(), proposal_before);
        assert_eq!(client.list_count(), 0);
    }

    #[tokio::test]
    async fn partial_schedule_reports_server_count() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 2)));
        let proposer = proposer(Arc::clone(&client));
        proposer.preview().await;

        let ProposalOutcome::Scheduled { scheduled_count, refresh } =
            proposer.schedule(&AutoConfirm(true)).await
        else {
            panic!("expected scheduled outcome");
        };
        assert_eq!(scheduled_count, 2);
        assert_eq!(
            proposer.status(),
            StatusState::success("Successfully added 2 breaks to your calendar!")
        );
        refresh.await.expect("refresh task");
    }

    #[tokio::test]
    async fn failed_schedule_keeps_previous_proposal() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        client.push_breaks(FakeCall::err(InfraError::Api {
            status: 500,
            message: Some("Calendar write failed".to_string()),
        }));
        let proposer = proposer(Arc::clone(&client));
        proposer.preview().await;
        let proposal_before = proposer.proposal();

        assert!(matches!(
            proposer.schedule(&AutoConfirm(true)).await,
            ProposalOutcome::Failed
        ));
        assert_eq!(proposer.status(), StatusState::danger("Calendar write failed"));
        assert_eq!(proposer.proposal(), proposal_before);
        assert_eq!(proposer.pending_count(), 3);
        assert_eq!(client.list_count(), 0);
    }

    #[tokio::test]
    async fn unauthenticated_preview_asks_for_login() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::err(InfraError::AuthenticationRequired));
        let proposer = proposer(Arc::clone(&client));

        assert!(matches!(proposer.preview().await, ProposalOutcome::Failed));
        let status = proposer.status();
        assert_eq!(status.message, BREAK_FAILURES.login);
        assert_eq!(status.tone, Tone::Danger);
        assert_eq!(proposer.view(), ProposalView::Error(BREAK_FAILURES.login.to_string()));
        assert!(proposer.proposal().is_none());
    }

    #[tokio::test]
    async fn later_preview_wins_over_slower_earlier_one() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(
            FakeCall::ok(payload(vec![suggestion("Recovery Break", 1.0, "slow")], 0)).delayed(80),
        );
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        let proposer = proposer(Arc::clone(&client));

        let (first, second) = tokio::join!(proposer.preview(), proposer.preview());

        assert!(matches!(first, ProposalOutcome::Stale));
        assert!(matches!(second, ProposalOutcome::Previewed { count: 3 }));
        assert_eq!(proposer.pending_count(), 3);
    }

    #[tokio::test]
    async fn commit_overtaken_by_preview_still_refreshes_feed() {
        let client = FakeWellnessApiClient::shared();
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 0)));
        client.push_breaks(FakeCall::ok(payload(three_suggestions(), 2)).delayed(80));
        client.push_breaks(FakeCall::ok(payload(vec![suggestion("Focus Sprint", 4.0, "")], 0)));
        client.push_events(FakeCall::ok(vec![event_in_hours("Recovery Break", 2)]));
        let proposer = proposer(Arc::clone(&client));
        proposer.preview().await;

        let (committed, previewed) = tokio::join!(proposer.schedule(&AutoConfirm(true)), async {
            sleep(Duration::from_millis(10)).await;
            proposer.preview().await
        });

        assert!(matches!(previewed, ProposalOutcome::Previewed { count: 1 }));
        let ProposalOutcome::Superseded { scheduled_count, refresh } = committed else {
            panic!("expected superseded commit");
        };
        assert_eq!(scheduled_count, 2);
        assert_eq!(client.break_flags(), vec![false, true, false]);
        assert_eq!(proposer.pending_count(), 1);
        assert!(!proposer.proposal().expect("proposal").provisional);

        let refreshed = refresh.await.expect("refresh task");
        assert_eq!(refreshed, RefreshOutcome::Loaded { shown: 1, hidden: 0 });
        assert_eq!(client.list_count(), 1);
    }

    #[test]
    fn unknown_category_keeps_its_label_with_generic_glyph() {
        let client = FakeWellnessApiClient::shared();
        let proposer = proposer(client);
        let card = proposer.to_card(&suggestion("Stretch", 0.0, ""), fixed_now());
        assert_eq!(card.label, "Stretch");
        assert_eq!(card.glyph, "⏸️");
        assert_eq!(card.scheduled_at, fixed_now());
    }
}
