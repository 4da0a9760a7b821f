//! Structured JSON logging on stdout (spec.md §6): one object per line
//! with `timestamp`, `level`, `server_id`, `message`, and an optional
//! `data` object, built on the `tracing` + `tracing-subscriber` stack
//! (never a hand-rolled logger).
//!
//! `server_id` is attached once, as a field on the span entered around
//! the whole reconciliation loop (see `bin/jijid.rs`), rather than
//! repeated on every individual `info!`/`warn!`/`error!` call site.
//! `with_current_span`/`with_span_list` stay on (the default) so that
//! span is serialized onto every line emitted while it's entered.

use tracing_subscriber::EnvFilter;

/// Installs the global JSON subscriber. `level` is the default filter
/// directive (e.g. `"info"`); it is overridden by `RUST_LOG` if set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
