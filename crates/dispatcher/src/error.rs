//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Contract-level error (transform, routing, queue, store, sink)
    #[error("{0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// True for errors that must abort startup rather than a single message
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::SinkCreation { .. } => true,
            Self::Contract(e) => e.is_fatal(),
            Self::Io(_) => false,
        }
    }
}
