//! Tracing initialization.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! embedding application's choice. [`init`] is a convenience for binaries
//! and tests that want the standard setup: an `EnvFilter` honoring
//! `RUST_LOG`, a compact fmt layer, and span traces for error reports.

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the default subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(ErrorLayer::default())
        .try_init();
}
