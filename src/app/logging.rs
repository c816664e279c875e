// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Expand a bare level into a filter spec. Custom directive strings (with ','
/// or '=') are respected as-is.
pub fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.is_empty() {
        return "info".to_string();
    }
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        // Per-frame journal traffic is only useful when asked for explicitly.
        format!("{normalized},ledger=info")
    }
}

/// Install the global subscriber. A second call is a no-op, so tests and the
/// CLI can both call it.
pub fn setup_logging(log_level: &str, json_format: bool) {
    let filter_spec = filter_spec(log_level);
    let filter = EnvFilter::from_str(&filter_spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).try_init().is_ok()
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).try_init().is_ok()
    };
    if !installed {
        return;
    }

    let directives: Vec<&str> = filter_spec
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    let base = directives.first().copied().unwrap_or("info");
    let overrides = directives
        .iter()
        .skip(1)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

    tracing::info!(
        "Logging initialized\n  base: {base}\n  overrides: {}\n  format: {}",
        if overrides.is_empty() { "none" } else { overrides.as_str() },
        if json_format { "json" } else { "compact" }
    );
}
