//! Test harness for LogMiner and normalization tests
//!
//! - Scripted in-memory [`MockConnection`] and [`MockFactory`]
//! - Builders for generic wrapper envelopes and row payloads

#![allow(dead_code)]

pub mod envelopes;
pub mod mock_oracle;

pub use envelopes::*;
pub use mock_oracle::{MockConnection, MockFactory};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging (idempotent)
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("logminer_cdc=debug".parse().unwrap()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}
