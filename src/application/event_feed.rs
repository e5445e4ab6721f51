use crate::application::request_token::RequestSequencer;
use crate::application::status::{report_failure, FailureMessages};
use crate::domain::models::{filter_upcoming, CalendarEvent, StatusState};
use crate::infrastructure::wellness_client::WellnessApiClient;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const SYNCING_MESSAGE: &str = "Syncing with your calendar…";
pub const EMPTY_FEED_MESSAGE: &str = "No upcoming events in the next month.";

const FEED_FAILURES: FailureMessages = FailureMessages {
    fallback: "Failed to refresh events",
    login: "Please log in to view your calendar.",
    transport: "Could not reach the calendar service. Please try again.",
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventCard {
    pub id: Option<String>,
    pub title: String,
    pub starts: String,
    pub ends: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "state", content = "content")]
pub enum FeedView {
    #[default]
    Idle,
    Loading,
    Empty,
    Error(String),
    Events(Vec<EventCard>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded { shown: usize, hidden: usize },
    Empty,
    Failed,
    /// A newer refresh started before this one completed.
    Stale,
}

#[derive(Debug, Default)]
struct FeedState {
    view: FeedView,
    status: StatusState,
}

/// Upcoming-events agenda, replaced wholesale on every refresh.
pub struct EventFeed<C>
where
    C: WellnessApiClient,
{
    client: Arc<C>,
    time_zone: Tz,
    now_provider: NowProvider,
    sequencer: RequestSequencer,
    state: Mutex<FeedState>,
}

impl<C> EventFeed<C>
where
    C: WellnessApiClient,
{
    pub fn new(client: Arc<C>, time_zone: Tz) -> Self {
        Self {
            client,
            time_zone,
            now_provider: Arc::new(Utc::now),
            sequencer: RequestSequencer::default(),
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn view(&self) -> FeedView {
        self.lock_state().view.clone()
    }

    pub fn status(&self) -> StatusState {
        self.lock_state().status.clone()
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let token = {
            let mut state = self.lock_state();
            state.status = StatusState::info(SYNCING_MESSAGE);
            state.view = FeedView::Loading;
            self.sequencer.issue()
        };

        let result = self.client.list_events().await;
        let now = (self.now_provider)();

        let mut state = self.lock_state();
        if !self.sequencer.is_current(token) {
            tracing::debug!(command = "refresh_events", token = token.value(), "dropping stale response");
            return RefreshOutcome::Stale;
        }

        let events = match result {
            Ok(events) => events,
            Err(error) => {
                let message = report_failure("refresh_events", &error, &FEED_FAILURES);
                state.view = FeedView::Error(message.clone());
                state.status = StatusState::danger(message);
                return RefreshOutcome::Failed;
            }
        };

        let fetched = events.len();
        let upcoming = filter_upcoming(events, now, self.time_zone);
        let hidden = fetched - upcoming.len();
        if upcoming.is_empty() {
            state.view = FeedView::Empty;
            state.status = StatusState::cleared();
            tracing::info!(command = "refresh_events", fetched, hidden, "no upcoming events");
            return RefreshOutcome::Empty;
        }

        let cards = upcoming
            .iter()
            .map(|event| self.to_card(event))
            .collect::<Vec<_>>();
        let shown = cards.len();
        state.status = StatusState::success(if shown == 1 {
            "Showing 1 upcoming event.".to_string()
        } else {
            format!("Showing {shown} upcoming events.")
        });
        state.view = FeedView::Events(cards);
        tracing::info!(command = "refresh_events", shown, hidden, "calendar feed refreshed");

        RefreshOutcome::Loaded { shown, hidden }
    }

    fn to_card(&self, event: &CalendarEvent) -> EventCard {
        EventCard {
            id: event.id.clone(),
            title: event.summary.clone(),
            starts: event.start.display(self.time_zone),
            ends: event.end.as_ref().map(|end| end.display(self.time_zone)),
            description: event.description.clone(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        event_at, event_in_hours, fixed_now, FakeCall, FakeWellnessApiClient,
    };
    use crate::domain::models::{EventTime, Tone};
    use crate::infrastructure::error::InfraError;
    use chrono::{NaiveDate, TimeDelta};
    use proptest::prelude::*;

    fn feed(client: Arc<FakeWellnessApiClient>) -> EventFeed<FakeWellnessApiClient> {
        EventFeed::new(client, Tz::UTC).with_now_provider(Arc::new(fixed_now))
    }

    #[tokio::test]
    async fn single_future_event_renders_one_card_without_end() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::ok(vec![event_in_hours("Standup", 1)]));
        let feed = feed(Arc::clone(&client));

        let outcome = feed.refresh().await;

        assert_eq!(outcome, RefreshOutcome::Loaded { shown: 1, hidden: 0 });
        let FeedView::Events(cards) = feed.view() else {
            panic!("expected events view");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Standup");
        assert_eq!(cards[0].starts, "Mon Feb 16, 2026 1:00 PM");
        assert!(cards[0].ends.is_none());
        assert_eq!(feed.status().tone, Tone::Success);
    }

    #[tokio::test]
    async fn past_events_are_filtered_and_end_is_rendered() {
        let client = FakeWellnessApiClient::shared();
        let mut review = event_in_hours("Review", 3);
        review.end = Some(EventTime::At((fixed_now() + TimeDelta::hours(4)).fixed_offset()));
        client.push_events(FakeCall::ok(vec![
            event_in_hours("Yesterday", -24),
            review,
            event_at("Just started", fixed_now() - TimeDelta::seconds(1)),
        ]));
        let feed = feed(Arc::clone(&client));

        assert_eq!(feed.refresh().await, RefreshOutcome::Loaded { shown: 1, hidden: 2 });
        let FeedView::Events(cards) = feed.view() else {
            panic!("expected events view");
        };
        assert_eq!(cards[0].title, "Review");
        assert_eq!(cards[0].ends.as_deref(), Some("Mon Feb 16, 2026 4:00 PM"));
    }

    #[tokio::test]
    async fn status_counts_shown_events() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::ok(vec![event_in_hours("Standup", 1)]));
        client.push_events(FakeCall::ok(vec![
            event_in_hours("Standup", 1),
            event_in_hours("Review", 2),
            event_in_hours("Gone", -1),
        ]));
        let feed = feed(Arc::clone(&client));

        feed.refresh().await;
        assert_eq!(feed.status(), StatusState::success("Showing 1 upcoming event."));
        feed.refresh().await;
        assert_eq!(feed.status(), StatusState::success("Showing 2 upcoming events."));
    }

    #[tokio::test]
    async fn all_day_event_today_stays_visible() {
        let client = FakeWellnessApiClient::shared();
        let mut offsite = event_in_hours("Offsite", 0);
        offsite.start = EventTime::AllDay(NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date"));
        client.push_events(FakeCall::ok(vec![offsite]));
        let feed = feed(Arc::clone(&client));

        assert_eq!(feed.refresh().await, RefreshOutcome::Loaded { shown: 1, hidden: 0 });
        let FeedView::Events(cards) = feed.view() else {
            panic!("expected events view");
        };
        assert_eq!(cards[0].starts, "Mon Feb 16, 2026");
    }

    #[tokio::test]
    async fn empty_and_all_past_results_show_empty_state() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::ok(Vec::new()));
        client.push_events(FakeCall::ok(vec![event_in_hours("Old", -2)]));
        let feed = feed(Arc::clone(&client));

        assert_eq!(feed.refresh().await, RefreshOutcome::Empty);
        assert_eq!(feed.view(), FeedView::Empty);
        assert!(feed.status().is_cleared());

        assert_eq!(feed.refresh().await, RefreshOutcome::Empty);
        assert_eq!(feed.view(), FeedView::Empty);
    }

    #[tokio::test]
    async fn server_error_message_is_shown_verbatim() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::err(InfraError::Api {
            status: 500,
            message: Some("Calendar quota exceeded".to_string()),
        }));
        let feed = feed(Arc::clone(&client));

        assert_eq!(feed.refresh().await, RefreshOutcome::Failed);
        assert_eq!(feed.view(), FeedView::Error("Calendar quota exceeded".to_string()));
        assert_eq!(feed.status(), StatusState::danger("Calendar quota exceeded"));
    }

    #[tokio::test]
    async fn unauthenticated_and_transport_failures_are_distinct() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::err(InfraError::AuthenticationRequired));
        client.push_events(FakeCall::err(InfraError::Transport("refused".to_string())));
        let feed = feed(Arc::clone(&client));

        feed.refresh().await;
        assert_eq!(feed.status(), StatusState::danger(FEED_FAILURES.login));

        feed.refresh().await;
        assert_eq!(feed.status(), StatusState::danger(FEED_FAILURES.transport));
    }

    #[tokio::test]
    async fn later_refresh_wins_over_slower_earlier_one() {
        let client = FakeWellnessApiClient::shared();
        client.push_events(FakeCall::ok(vec![event_in_hours("Slow", 1)]).delayed(80));
        client.push_events(FakeCall::ok(vec![event_in_hours("Fast", 2)]));
        let feed = feed(Arc::clone(&client));

        let (first, second) = tokio::join!(feed.refresh(), feed.refresh());

        assert_eq!(first, RefreshOutcome::Stale);
        assert_eq!(second, RefreshOutcome::Loaded { shown: 1, hidden: 0 });
        let FeedView::Events(cards) = feed.view() else {
            panic!("expected events view");
        };
        assert_eq!(cards[0].title, "Fast");
        assert_eq!(client.list_count(), 2);
    }

    proptest! {
        #[test]
        fn refresh_shows_exactly_the_upcoming_events(offsets in proptest::collection::vec(-48i64..48, 1..20)) {
            let runtime = tokio::runtime::Runtime::new().expect("runtime");
            runtime.block_on(async move {
                let client = FakeWellnessApiClient::shared();
                let events = offsets
                    .iter()
                    .enumerate()
                    .map(|(index, hours)| event_in_hours(&format!("e{index}"), *hours))
                    .collect::<Vec<_>>();
                client.push_events(FakeCall::ok(events));
                let feed = feed(Arc::clone(&client));

                feed.refresh().await;

                let expected = offsets
                    .iter()
                    .enumerate()
                    .filter(|(_, hours)| **hours >= 0)
                    .map(|(index, _)| format!("e{index}"))
                    .collect::<Vec<_>>();
                let shown = match feed.view() {
                    FeedView::Events(cards) => cards.into_iter().map(|card| card.title).collect::<Vec<_>>(),
                    FeedView::Empty => Vec::new(),
                    other => panic!("unexpected view {other:?}"),
                };
                assert_eq!(shown, expected);
            });
        }
    }
}
