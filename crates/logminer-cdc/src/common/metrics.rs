//! # Normalizer metrics
//!
//! Atomic counters for the normalization path, mirrored to the `metrics`
//! crate facade so any installed recorder (Prometheus, StatsD, ...) sees
//! them.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `logminer_cdc_records_received_total` | |
//! | `logminer_cdc_records_total` | `kind` = `ddl`, `dml`, `marker` |
//! | `logminer_cdc_unrecognized_op_types_total` | |
//! | `logminer_cdc_errors_total` | `code`, `category` |

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::CdcError;

/// Counters for one normalizer.
#[derive(Debug, Default)]
pub struct NormalizerMetrics {
    records_received: AtomicU64,
    ddl_emitted: AtomicU64,
    dml_emitted: AtomicU64,
    markers_dropped: AtomicU64,
    unrecognized_op_types: AtomicU64,
    errors: AtomicU64,
}

impl NormalizerMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound record.
    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("logminer_cdc_records_received_total").increment(1);
    }

    /// Record an emitted DDL record.
    #[inline]
    pub fn record_ddl(&self) {
        self.ddl_emitted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("logminer_cdc_records_total", "kind" => "ddl").increment(1);
    }

    /// Record an emitted DML record.
    #[inline]
    pub fn record_dml(&self) {
        self.dml_emitted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("logminer_cdc_records_total", "kind" => "dml").increment(1);
    }

    /// Record a dropped marker.
    #[inline]
    pub fn record_marker(&self) {
        self.markers_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("logminer_cdc_records_total", "kind" => "marker").increment(1);
    }

    /// Record a row with an op type outside I/U/D.
    #[inline]
    pub fn record_unknown_op(&self) {
        self.unrecognized_op_types.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("logminer_cdc_unrecognized_op_types_total").increment(1);
    }

    /// Record a failed record.
    pub fn record_error(&self, error: &CdcError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "logminer_cdc_errors_total",
            "code" => error.error_code(),
            "category" => error.category().as_str()
        )
        .increment(1);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> NormalizerMetricsSnapshot {
        NormalizerMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            ddl_emitted: self.ddl_emitted.load(Ordering::Relaxed),
            dml_emitted: self.dml_emitted.load(Ordering::Relaxed),
            markers_dropped: self.markers_dropped.load(Ordering::Relaxed),
            unrecognized_op_types: self.unrecognized_op_types.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`NormalizerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerMetricsSnapshot {
    /// Records handed to the normalizer
    pub records_received: u64,
    /// DDL records produced
    pub ddl_emitted: u64,
    /// DML records produced
    pub dml_emitted: u64,
    /// Markers dropped
    pub markers_dropped: u64,
    /// Rows with an op type outside I/U/D
    pub unrecognized_op_types: u64,
    /// Records that failed
    pub errors: u64,
}

impl NormalizerMetricsSnapshot {
    /// Records that produced output
    pub fn emitted(&self) -> u64 {
        self.ddl_emitted + self.dml_emitted
    }
}
