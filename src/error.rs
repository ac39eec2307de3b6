// Error taxonomy for task operations

use std::path::PathBuf;

/// Errors returned by the task store, filter and exporter
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Bad user input: empty title, malformed date, unknown priority
    #[error("invalid input: {0}")]
    Validation(String),

    /// No task with the given id
    #[error("task not found: {0}")]
    NotFound(String),

    /// The persisted file exists but cannot be understood
    #[error("corrupt task file {path:?}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// Filesystem failure while reading, saving or exporting
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        TaskError::Validation(msg.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TaskError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TaskError::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors the user can fix by changing their input
    pub fn is_user_error(&self) -> bool {
        matches!(self, TaskError::Validation(_) | TaskError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
