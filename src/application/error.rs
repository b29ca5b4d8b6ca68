// Fetch error taxonomy shared by subscriptions and commands
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("backend answered with status {status}")]
    Http { status: u16, message: Option<String> },

    #[error("backend reported failure: {0}")]
    Application(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Text shown next to the affected source or control.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Timeout(_) => "Service timeout. Please retry.".to_string(),
            FetchError::Transport(_) => "Unable to reach microservice.".to_string(),
            FetchError::Http {
                message: Some(message),
                ..
            } => message.clone(),
            FetchError::Http { status, .. } => format!("Service returned HTTP {}.", status),
            FetchError::Application(message) => message.clone(),
            FetchError::Decode(_) => "Unexpected response from service.".to_string(),
        }
    }
}
