// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::services::keeper::stats::KeeperStats;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serves keeper counters as Prometheus text until `shutdown` fires.
pub async fn spawn_metrics_server(
    port: u16,
    stats: Arc<KeeperStats>,
    shutdown: CancellationToken,
) -> Option<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(target: "metrics", "Metrics server failed to bind: {}", e);
            return None;
        }
    };

    let local = listener.local_addr().ok();
    if let Some(addr) = local {
        tracing::info!(target: "metrics", "Metrics server listening on {}", addr);
    }

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((mut socket, _)) => {
                        let body = render_metrics(&stats);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                    }
                    Err(e) => {
                        tracing::warn!(target: "metrics", "Metrics accept error: {}", e);
                    }
                }
            }
        }
    });

    local
}

pub fn render_metrics(stats: &KeeperStats) -> String {
    let mut body = String::new();
    for (name, help, value) in stats.snapshot().counters() {
        let _ = write!(
            body,
            "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
        );
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn metrics_endpoint_serves() {
        let stats = Arc::new(KeeperStats::default());
        KeeperStats::bump(&stats.ticks);
        KeeperStats::bump(&stats.batches_confirmed);
        let shutdown = CancellationToken::new();

        let addr = spawn_metrics_server(0, stats.clone(), shutdown.clone())
            .await
            .expect("bind metrics");

        let mut socket = TcpStream::connect(("127.0.0.1", addr.port()))
            .await
            .expect("connect");
        socket
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        socket.read_to_string(&mut response).await.unwrap();
        shutdown.cancel();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("keeper_ticks_total 1"));
        assert!(response.contains("keeper_batches_confirmed_total 1"));
        assert!(response.contains("keeper_batches_failed_total 0"));
    }
}
