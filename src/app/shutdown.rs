// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use tokio_util::sync::CancellationToken;

/// Token cancelled on the first Ctrl+C (or SIGTERM on unix).
pub fn cancel_on_stop_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let signal = stop_signal().await;
        tracing::info!(target: "shutdown", signal, "Stop requested; finishing the current batch");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn stop_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            _ = tokio::signal::ctrl_c() => "ctrl_c",
            _ = term.recv() => "sigterm",
        },
        Err(e) => {
            tracing::warn!(target: "shutdown", error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
            "ctrl_c"
        }
    }
}

#[cfg(not(unix))]
async fn stop_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl_c"
}
