//! Error types for CDC operations
//!
//! Includes error classification for alerting and for the surrounding
//! orchestration layer, which owns retry policy.

use crate::logminer::LogMinerError;
use crate::normalize::SchemaFingerprint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories for metrics and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Database-specific errors (catalog query, LogMiner calls)
    Database,
    /// Schema-related errors (unparseable or malformed schema documents)
    Schema,
    /// Configuration errors (missing input fields, missing cached schemas)
    Configuration,
    /// Network errors (connection, timeout)
    Network,
    /// Serialization errors (JSON, Avro)
    Serialization,
}

impl ErrorCategory {
    /// Metric label for the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Schema => "schema",
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::Serialization => "serialization",
        }
    }
}

/// CDC-specific errors
#[derive(Error, Debug)]
pub enum CdcError {
    /// LogMiner session setup or teardown failed
    #[error("LogMiner error: {0}")]
    LogMiner(#[from] LogMinerError),

    /// The inbound record does not carry the configured payload field
    #[error("Input record does not contain the field '{0}'")]
    MissingInputField(String),

    /// The envelope references a fingerprint the schema cache was not fed
    #[error("Schema with fingerprint {0} not found in schema cache")]
    SchemaNotFound(SchemaFingerprint),

    /// Op type outside I/U/D (strict mode only)
    #[error("Unrecognized operation type '{0}'")]
    UnrecognizedOperation(String),

    /// Schema document error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CdcError {
    /// Create a new schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a missing input field error
    pub fn missing_input_field(field: impl Into<String>) -> Self {
        Self::MissingInputField(field.into())
    }

    /// Check if this error is retriable.
    ///
    /// Returns true for transient errors that may succeed on retry. Pipeline
    /// configuration errors (missing fields, missing schemas) never are.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::LogMiner(e) => e.is_retriable(),

            Self::MissingInputField(_)
            | Self::SchemaNotFound(_)
            | Self::UnrecognizedOperation(_)
            | Self::Schema(_)
            | Self::Config(_)
            | Self::Serialization(_)
            | Self::Json(_) => false,
        }
    }

    /// Get the error category for metrics and alerting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LogMiner(LogMinerError::Connection { .. }) => ErrorCategory::Network,
            Self::LogMiner(_) => ErrorCategory::Database,
            Self::MissingInputField(_) => ErrorCategory::Configuration,
            Self::SchemaNotFound(_) => ErrorCategory::Configuration,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::UnrecognizedOperation(_) => ErrorCategory::Serialization,
            Self::Schema(_) => ErrorCategory::Schema,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }

    /// Get a metric-safe error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LogMiner(_) => "logminer_error",
            Self::MissingInputField(_) => "missing_input_field",
            Self::SchemaNotFound(_) => "schema_not_found",
            Self::UnrecognizedOperation(_) => "unrecognized_operation",
            Self::Schema(_) => "schema_error",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
            Self::Json(_) => "json_error",
        }
    }
}

impl From<apache_avro::Error> for CdcError {
    fn from(e: apache_avro::Error) -> Self {
        CdcError::Serialization(e.to_string())
    }
}

/// Result type for CDC operations
pub type Result<T, E = CdcError> = std::result::Result<T, E>;
