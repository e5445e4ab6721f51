use crate::application::break_proposer::{BreakCard, ProposalView, EMPTY_PROPOSAL_MESSAGE};
use crate::application::event_feed::{EventCard, FeedView, EMPTY_FEED_MESSAGE, SYNCING_MESSAGE};
use crate::application::status::present;
use crate::domain::models::StatusState;

/// Escapes `&`, `<` and `>` for inclusion in HTML text content.
pub fn escape_markup(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn placeholder(text: &str) -> String {
    format!("<p class=\"placeholder\">{}</p>", escape_markup(text))
}

pub fn feed_markup(view: &FeedView) -> String {
    match view {
        FeedView::Idle => String::new(),
        FeedView::Loading => placeholder(SYNCING_MESSAGE),
        FeedView::Empty => placeholder(EMPTY_FEED_MESSAGE),
        FeedView::Error(message) => placeholder(message),
        FeedView::Events(cards) => cards.iter().map(event_card_markup).collect(),
    }
}

fn event_card_markup(card: &EventCard) -> String {
    let mut html = String::from("<div class=\"event-card\"><div class=\"event-summary\">");
    html.push_str(&format!("<h3>{}</h3>", escape_markup(&card.title)));
    html.push_str(&format!("<p class=\"event-time\">{}", escape_markup(&card.starts)));
    if let Some(ends) = card.ends.as_deref() {
        html.push_str(&format!(" · Ends {}", escape_markup(ends)));
    }
    html.push_str("</p></div>");
    if let Some(description) = card.description.as_deref() {
        html.push_str(&format!(
            "<p class=\"event-description\">{}</p>",
            escape_markup(description)
        ));
    }
    html.push_str("</div>");
    html
}

pub fn proposal_markup(view: &ProposalView) -> String {
    match view {
        ProposalView::Idle => String::new(),
        ProposalView::Loading(message) => placeholder(message),
        ProposalView::Empty => placeholder(EMPTY_PROPOSAL_MESSAGE),
        ProposalView::Error(message) => placeholder(&format!("Error: {message}")),
        ProposalView::Suggestions(cards) => cards.iter().map(break_card_markup).collect(),
    }
}

fn break_card_markup(card: &BreakCard) -> String {
    format!(
        "<div class=\"break-card\"><div class=\"break-header\"><h4>{} {}</h4>\
         <span class=\"break-duration\">{}h</span></div>\
         <p class=\"break-time\">⏰ {}</p>\
         <p class=\"break-description\">{}</p></div>",
        card.glyph,
        escape_markup(&card.label),
        card.duration_hours,
        escape_markup(&card.display_time),
        escape_markup(&card.description),
    )
}

pub fn status_markup(state: &StatusState) -> String {
    let display = present(state);
    format!(
        "<p class=\"status status-{}\" style=\"color: {}\">{}</p>",
        display.tone,
        display.color,
        escape_markup(&display.text)
    )
}

/// Plain-text projection used by the terminal surface.
pub fn feed_text(view: &FeedView) -> String {
    match view {
        FeedView::Idle => String::new(),
        FeedView::Loading => SYNCING_MESSAGE.to_string(),
        FeedView::Empty => EMPTY_FEED_MESSAGE.to_string(),
        FeedView::Error(message) => message.clone(),
        FeedView::Events(cards) => cards
            .iter()
            .map(|card| {
                let mut lines = format!("• {}\n  {}", card.title, card.starts);
                if let Some(ends) = card.ends.as_deref() {
                    lines.push_str(&format!(" · Ends {ends}"));
                }
                if let Some(id) = card.id.as_deref() {
                    lines.push_str(&format!("\n  id: {id}"));
                }
                if let Some(description) = card.description.as_deref() {
                    lines.push_str(&format!("\n  {description}"));
                }
                lines
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn proposal_text(view: &ProposalView) -> String {
    match view {
        ProposalView::Idle => String::new(),
        ProposalView::Loading(message) => message.clone(),
        ProposalView::Empty => EMPTY_PROPOSAL_MESSAGE.to_string(),
        ProposalView::Error(message) => format!("Error: {message}"),
        ProposalView::Suggestions(cards) => cards
            .iter()
            .map(|card| {
                let mut lines = format!(
                    "{} {} ({}h)\n  ⏰ {}",
                    card.glyph, card.label, card.duration_hours, card.display_time
                );
                if !card.description.is_empty() {
                    lines.push_str(&format!("\n  {}", card.description));
                }
                lines
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// `None` for a cleared status.
pub fn status_text(state: &StatusState) -> Option<String> {
    if state.is_cleared() {
        return None;
    }
    Some(format!("[{}] {}", state.tone.as_str(), state.message))
}
