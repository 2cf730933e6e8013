//! Layered error definitions
//!
//! Categorized by source: config / transform / queue / store / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors (fatal, startup-time) =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// No transformer registered under the configured name
    #[error("unknown transformer '{name}' for worker '{worker}'")]
    UnknownTransformer { worker: String, name: String },

    // ===== Dispatch Errors (per-message, recoverable) =====
    /// Transformer failed while processing a source key
    #[error("transform '{action}' failed on key '{key}' to destination '{destination}': {message}")]
    Transform {
        action: String,
        key: String,
        destination: String,
        message: String,
    },

    /// A document could not be date-routed
    #[error("cannot route document '{id}': {message}")]
    Routing { id: String, message: String },

    /// Malformed source block payload
    #[error("bad source block: {message}")]
    BadBlock { message: String },

    // ===== Queue Errors =====
    /// Work queue transport error
    #[error("queue '{queue}' error: {message}")]
    Queue { queue: String, message: String },

    // ===== Store Errors =====
    /// Bucket read error
    #[error("bucket '{bucket}' read error for key '{key}': {message}")]
    BucketRead {
        bucket: String,
        key: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Search query error
    #[error("search against '{alias}' failed: {message}")]
    Search { alias: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transform error
    pub fn transform(
        action: impl Into<String>,
        key: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            action: action.into(),
            key: key.into(),
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create routing error
    pub fn routing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Routing {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create queue transport error
    pub fn queue(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Queue {
            queue: queue.into(),
            message: message.into(),
        }
    }

    /// Create bucket read error
    pub fn bucket_read(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BucketRead {
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for errors that must abort startup rather than a single message
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::UnknownTransformer { .. }
        )
    }
}
