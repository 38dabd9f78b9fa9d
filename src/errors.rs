use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenPilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vision provider error: {0}")]
    VisionProvider(String),

    #[error("Failed to parse vision response: {0}")]
    VisionParse(String),

    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type ScreenPilotResult<T> = Result<T, ScreenPilotError>;

/// Machine-readable kind attached to every failed action outcome.
/// The human-readable explanation travels separately in [`ActionFailure::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    OutOfBounds,
    SafeZoneViolation,
    InvalidDirection,
    InvalidKey,
    ElementNotFound,
    VisionParse,
    VisionError,
    UserDeclined,
    ConfirmationTimeout,
    Cancelled,
    UnrecognizedAction,
    InputBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
