//! Console logging for the orchestrator.
//!
//! Environment-aware structured logging using the tracing ecosystem. Logs go
//! to stdout so containerized deployments can ship them without extra
//! plumbing. Level comes from `FAILOVER_LOG_LEVEL` (or `RUST_LOG` directive
//! syntax), defaulting to `info`.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Idempotent; safe to call from
/// both the server binary and tests.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let log_level = std::env::var("FAILOVER_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(use_ansi)
            .with_filter(EnvFilter::new(&log_level));

        let subscriber = tracing_subscriber::registry().with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::debug!(log_level = %log_level, ansi_colors = use_ansi, "Console logging initialized");
        }
    });
}
