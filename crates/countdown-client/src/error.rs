//! Client error types

use thiserror::Error;

use crate::push::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The resource does not exist. An expected steady state (for example no
    /// selected timer), not a fault.
    #[error("Not found{}", .0.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    NotFound(Option<String>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Push channel error: {0}")]
    Transport(#[from] TransportError),

    /// Form input rejected before any request was made.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidState(String),

    #[error("Subscription closed")]
    Closed,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Message the server attached to a 404, if any.
    pub fn not_found_message(&self) -> Option<&str> {
        match self {
            ClientError::NotFound(message) => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
