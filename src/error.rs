//! Errors raised by tracking operations

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("a session is already running: {0} (stop or push first)")]
    AlreadyRunning(String),

    #[error(
        "time range overlaps [{description}] {}~{}",
        .start.format("%H:%M"),
        .end.format("%H:%M")
    )]
    Overlap {
        description: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("no task matches `{0}`")]
    TaskNotFound(String),

    #[error("index {index} is out of range (1-{len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no session is running")]
    NoActiveSession,

    #[error("no earlier task to resume")]
    NothingToResume,

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to read the answer: {0}")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse grouping used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    InvalidInput,
    Storage,
}

impl TrackError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyRunning(_) | Self::Overlap { .. } => ErrorKind::Conflict,
            Self::TaskNotFound(_)
            | Self::IndexOutOfRange { .. }
            | Self::NoActiveSession
            | Self::NothingToResume => ErrorKind::NotFound,
            Self::InvalidChoice(_) | Self::InvalidInput(_) | Self::Prompt(_) => {
                ErrorKind::InvalidInput
            }
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackError>;
