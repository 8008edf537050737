//! Traits shared by CDC sources

use crate::common::Result;

/// Configuration trait for CDC sources
pub trait CdcConfig: Send + Sync {
    /// Get the source type name (e.g., "oracle")
    fn source_type(&self) -> &'static str;

    /// Get the connection string, without credentials
    fn connection_string(&self) -> String;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;
}
