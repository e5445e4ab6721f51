pub mod bootstrap;
pub mod break_proposer;
pub mod controller;
pub mod event_feed;
pub mod event_form;
pub mod render;
pub mod request_token;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;
