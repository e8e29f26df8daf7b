//! UseCase 層のエラー定義
//!
//! Each operation group has its own error enum. All of them classify into
//! [`ErrorKind`], which the UI layer maps onto HTTP status codes and the
//! WebSocket `error` event.

use thiserror::Error;

use crate::domain::{MessagePushError, RepositoryError, ValidationError};

/// Coarse failure class shared by every use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; fix the request before retrying.
    Validation,
    /// No authenticated user where one is required.
    Unauthenticated,
    /// The user is not allowed to act on the target.
    Forbidden,
    /// The id does not resolve.
    NotFound,
    Conflict,
    /// The target exists but its state forbids the operation.
    Policy,
    /// The store or the hub failed; may succeed on retry.
    Store,
}

fn repository_kind(err: &RepositoryError) -> ErrorKind {
    match err {
        RepositoryError::NotFound { .. } => ErrorKind::NotFound,
        RepositoryError::Conflict(_) => ErrorKind::Conflict,
        RepositoryError::Unavailable(_) => ErrorKind::Store,
    }
}

/// Chat send, history and status errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("booking '{0}' not found")]
    BookingNotFound(String),

    #[error("message '{0}' not found")]
    MessageNotFound(String),

    #[error("chat is not available for a {0} booking")]
    ChatNotAllowed(&'static str),

    #[error("user '{0}' is not a party of this booking")]
    NotParticipant(String),

    #[error("receiver '{0}' is not the other party of this booking")]
    InvalidReceiver(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidReceiver(_) => ErrorKind::Validation,
            Self::BookingNotFound(_) | Self::MessageNotFound(_) => ErrorKind::NotFound,
            Self::ChatNotAllowed(_) => ErrorKind::Policy,
            Self::NotParticipant(_) => ErrorKind::Forbidden,
            Self::Store(e) => repository_kind(e),
        }
    }
}

/// Live session lifecycle and relay errors
#[derive(Debug, Error)]
pub enum LiveSessionError {
    #[error("booking '{0}' not found")]
    BookingNotFound(String),

    #[error("booking '{0}' is closed for live tracking")]
    BookingClosed(String),

    #[error("only the assigned worker may control live tracking")]
    NotAssignedWorker,

    #[error("connection has not joined live session '{0}'")]
    NotSubscribed(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl LiveSessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookingNotFound(_) => ErrorKind::NotFound,
            Self::BookingClosed(_) => ErrorKind::Policy,
            Self::NotAssignedWorker | Self::NotSubscribed(_) => ErrorKind::Forbidden,
            Self::Store(e) => repository_kind(e),
        }
    }
}

/// Notification fan-out and read-state errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("notification '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl NotifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(e) => repository_kind(e),
        }
    }
}

/// Connection authentication and room admission errors
#[derive(Debug, Error)]
pub enum RoomAccessError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid token")]
    InvalidToken,

    #[error("booking '{0}' not found")]
    BookingNotFound(String),

    #[error("live session '{0}' not found")]
    SessionNotFound(String),

    #[error("user '{user}' may not join {room}")]
    Forbidden { user: String, room: String },

    #[error(transparent)]
    Hub(#[from] MessagePushError),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl RoomAccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated | Self::InvalidToken => ErrorKind::Unauthenticated,
            Self::BookingNotFound(_) | Self::SessionNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Hub(_) => ErrorKind::Store,
            Self::Store(e) => repository_kind(e),
        }
    }
}

/// Booking producer errors
#[derive(Debug, Error)]
pub enum BookingEventError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("booking '{0}' not found")]
    NotFound(String),

    #[error("booking '{0}' already exists")]
    AlreadyExists(String),

    #[error("user '{0}' is not a party of this booking")]
    NotParticipant(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl BookingEventError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::NotParticipant(_) => ErrorKind::Forbidden,
            Self::Store(e) => repository_kind(e),
        }
    }
}
