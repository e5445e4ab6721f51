use crate::domain::models::{StatusState, Tone};
use crate::infrastructure::error::InfraError;
use serde::Serialize;

/// What a status surface shows: the text and its tone color.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusDisplay {
    pub text: String,
    pub tone: &'static str,
    pub color: &'static str,
}

pub fn present(state: &StatusState) -> StatusDisplay {
    StatusDisplay {
        text: state.message.clone(),
        tone: state.tone.as_str(),
        color: state.tone.color(),
    }
}

/// Projection for callers holding a free-form tone name.
pub fn present_raw(message: &str, tone: &str) -> StatusDisplay {
    present(&StatusState::new(message, Tone::parse(tone)))
}

/// Per-operation wording for the failure taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct FailureMessages {
    pub fallback: &'static str,
    pub login: &'static str,
    pub transport: &'static str,
}

pub fn describe_failure(error: &InfraError, messages: &FailureMessages) -> String {
    match error {
        InfraError::AuthenticationRequired => messages.login.to_string(),
        InfraError::Transport(_) => messages.transport.to_string(),
        InfraError::Api { .. } => error
            .server_message()
            .unwrap_or(messages.fallback)
            .to_string(),
        _ => messages.fallback.to_string(),
    }
}

/// Logs an operation failure and returns the text to show for it.
pub fn report_failure(command: &str, error: &InfraError, messages: &FailureMessages) -> String {
    let message = describe_failure(error, messages);
    match error {
        InfraError::AuthenticationRequired => {
            tracing::warn!(command, "authentication required")
        }
        _ => tracing::error!(command, %error, shown = %message, "operation failed"),
    }
    message
}
