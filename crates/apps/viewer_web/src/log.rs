//! `tracing` output routed to the browser console.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_wasm::{WASMLayer, WASMLayerConfigBuilder};

/// Installs the global subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let config = WASMLayerConfigBuilder::new()
        .set_max_level(level)
        .set_report_logs_in_timings(false)
        .build();
    let _ = tracing_subscriber::registry()
        .with(WASMLayer::new(config))
        .try_init();
}
