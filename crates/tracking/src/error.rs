//! Error types for the tracking engine
//!
//! None of these terminate the engine. Each one is resolved locally into a
//! well-defined state (event dropped, route unavailable, reconnect pending).

use crate::model::TaskId;
use taskroute_api_client::ApiError;
use taskroute_core::{Error, ErrorCode};
use taskroute_geo::GeoError;
use thiserror::Error;

/// Result type alias for tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Tracking errors
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Feed message could not be decoded
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Feed message names an event this engine does not handle
    #[error("unknown event type `{0}`")]
    UnknownEvent(String),

    /// Task record cannot be tracked
    #[error("invalid task {task_id}: {reason}")]
    InvalidTask {
        /// Offending task
        task_id: TaskId,
        /// What was wrong with it
        reason: String,
    },

    /// Coordinate out of range or not finite
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Push feed could not be opened
    #[error("feed connection failed: {0}")]
    Connect(String),

    /// Push feed failed after it was opened
    #[error("feed transport error: {0}")]
    Transport(String),

    /// Backend or directions provider call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Selection refers to a task that is not being tracked
    #[error("task {0} is not in progress")]
    UnknownTask(TaskId),

    /// The engine has shut down
    #[error("tracking engine has stopped")]
    EngineStopped,
}

impl TrackingError {
    /// Create an invalid task error
    pub fn invalid_task(task_id: TaskId, reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            task_id,
            reason: reason.into(),
        }
    }

    /// Coded classification shared with the CLI
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedEvent(_) | Self::UnknownEvent(_) => ErrorCode::MalformedEvent,
            Self::InvalidTask { .. } | Self::UnknownTask(_) => ErrorCode::InvalidTask,
            Self::Geo(_) => ErrorCode::InvalidCoordinate,
            Self::Connect(_) => ErrorCode::FeedConnectFailed,
            Self::Transport(_) => ErrorCode::FeedClosedUnexpectedly,
            Self::Api(e) if e.is_throttled() => ErrorCode::ProviderThrottled,
            Self::Api(_) => ErrorCode::ProviderUnavailable,
            Self::EngineStopped => ErrorCode::Internal,
        }
    }
}

impl From<TrackingError> for Error {
    fn from(err: TrackingError) -> Self {
        let code = err.code();
        let error = Error::new(code, err.to_string());
        match err {
            TrackingError::Connect(_) => {
                error.with_suggestion("Check [feed].url or TASKROUTE_FEED_URL and that the backend is running")
            }
            TrackingError::Api(ApiError::MissingApiKey) => {
                error.with_suggestion("Set GOOGLE_DIRECTIONS_API_KEY or [routing].api_key")
            }
            TrackingError::UnknownTask(_) => error.with_suggestion("Run `taskroute-tracker snapshot` to list tracked tasks"),
            other => error.with_source(other),
        }
    }
}
