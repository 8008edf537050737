//! # Common CDC Types and Traits
//!
//! - [`CdcError`] - Error type with retry and category classification
//! - [`CdcConfig`] - Source configuration contract
//! - [`NormalizerMetrics`] - Counters mirrored to the `metrics` facade

mod error;
mod metrics;
mod traits;

pub use error::{CdcError, ErrorCategory, Result};
pub use metrics::{NormalizerMetrics, NormalizerMetricsSnapshot};
pub use traits::CdcConfig;
