use thiserror::Error;

/// Failure talking to the indicators backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `message` is the server's `error` field when it sent one.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
