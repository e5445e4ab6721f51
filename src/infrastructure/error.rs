use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("authentication required: server returned a non-JSON response")]
    AuthenticationRequired,
    #[error("api error: http {status}{}", api_message_suffix(.message))]
    Api { status: u16, message: Option<String> },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl InfraError {
    /// Server-supplied message of an application error, when there is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }
}

fn api_message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!("; {message}"))
        .unwrap_or_default()
}
