use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransferError>;

/// Status code returned by a copy that completed.
pub const STATUS_SUCCESS: i32 = 0;

/// Which end of a transfer an I/O failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSide {
    Source,
    Destination,
}

impl fmt::Display for StreamSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamSide::Source => write!(f, "reading source"),
            StreamSide::Destination => write!(f, "writing destination"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid identifier {0:?}: {1}")]
    InvalidIdentifier(String, String),
    #[error("IO error while {0}: {1}")]
    Io(StreamSide, #[source] std::io::Error),
    #[error("Pick cancelled")]
    PickCancelled,
    #[error("Pick request superseded by a newer one")]
    Superseded,
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Transfer cancelled")]
    Cancelled,
    #[error("Operation timed out")]
    TimedOut,
    #[error("Access denied for {0:?}: {1}")]
    AccessDenied(String, String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("No pending pick request")]
    NoPendingPick,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransferError {
    /// Integer status handed back over the method channel.
    ///
    /// Every failure maps to a distinct non-zero value so callers can never
    /// confuse it with [`STATUS_SUCCESS`].
    pub fn status_code(&self) -> i32 {
        match self {
            TransferError::InvalidIdentifier(..) => 1,
            TransferError::Io(..) => 2,
            TransferError::PickCancelled => 3,
            TransferError::Superseded => 4,
            TransferError::UnknownOperation(_) => 5,
            TransferError::Cancelled => 6,
            TransferError::TimedOut => 7,
            TransferError::AccessDenied(..) => 8,
            TransferError::InvalidArguments(_) => 9,
            TransferError::NoPendingPick => 10,
            TransferError::Config(_) => 11,
            TransferError::Other(_) => 99,
        }
    }

    pub(crate) fn invalid_id(id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidIdentifier(id.into(), reason.to_string())
    }
}

impl From<tokio::task::JoinError> for TransferError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Other(anyhow::anyhow!("copy worker failed: {}", e))
    }
}
