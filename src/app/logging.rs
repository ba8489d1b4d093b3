// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const QUIET_MODULES: &[&str] = &[
    "h2=info",
    "hyper=info",
    "hyper_util=info",
    "reqwest=info",
    "alloy_transport_http=info",
    "alloy_rpc_client=info",
    "sqlx=warn",
];

/// Bare levels get quiet defaults for transport crates; directive strings
/// (with ',' or '=') are used as-is.
pub fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        return normalized.to_string();
    }
    let base = if normalized.is_empty() { "info" } else { normalized };
    std::iter::once(base)
        .chain(QUIET_MODULES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn setup_logging(log_level: &str, json_format: bool) -> Result<(), AppError> {
    let spec = filter_spec(log_level);
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).try_init()
    };
    installed.map_err(|e| AppError::Initialization(format!("Logging setup failed: {e}")))?;

    tracing::info!(
        target: "config",
        filter = %spec,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_gets_quiet_transport_defaults() {
        let spec = filter_spec("debug");
        assert!(spec.starts_with("debug,"));
        assert!(spec.contains("sqlx=warn"));
        assert!(EnvFilter::from_str(&spec).is_ok());
        assert!(filter_spec("").starts_with("info,"));
    }

    #[test]
    fn directive_strings_are_untouched() {
        assert_eq!(filter_spec("keeper=trace,warn"), "keeper=trace,warn");
    }
}
