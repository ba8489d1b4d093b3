// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::types::AuditRecord;
use crate::services::keeper::audit::AuditLogPublisher;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub const KEEPER_NOT_CONFIGURED: &str = "Keeper address not configured";

/// One decoded decision, shaped for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub timestamp: u64,
    pub time: Option<DateTime<Utc>>,
    pub decision: String,
    /// Wei, as a decimal string.
    pub fee_price: String,
    pub expected_profit: String,
    pub batch_size: u32,
    pub reason: String,
}

impl From<AuditRecord> for FeedEntry {
    fn from(record: AuditRecord) -> Self {
        Self {
            time: i64::try_from(record.timestamp)
                .ok()
                .and_then(DateTime::from_timestamp_millis),
            timestamp: record.timestamp,
            decision: record.decision.to_string(),
            fee_price: record.fee_price.to_string(),
            expected_profit: record.expected_profit,
            batch_size: record.batch_size,
            reason: record.reason,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    /// Newest first.
    pub logs: Vec<FeedEntry>,
    pub is_connected: bool,
    pub error: Option<String>,
}

/// Polls the keeper's published decisions for display.
pub struct LiveFeed {
    audit: Arc<AuditLogPublisher>,
    keeper: Option<Address>,
    limit: usize,
    poll: Duration,
    tx: watch::Sender<FeedSnapshot>,
}

impl LiveFeed {
    pub fn new(
        audit: Arc<AuditLogPublisher>,
        keeper: Option<Address>,
        limit: usize,
        poll: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(FeedSnapshot::default());
        Self {
            audit,
            keeper,
            limit,
            poll,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> FeedSnapshot {
        self.tx.borrow().clone()
    }

    pub async fn refresh(&self) -> FeedSnapshot {
        let previous = self.current();
        let next = match self.keeper {
            None => FeedSnapshot {
                logs: previous.logs,
                is_connected: false,
                error: Some(KEEPER_NOT_CONFIGURED.to_string()),
            },
            Some(keeper) => match self.audit.list_recent::<AuditRecord>(keeper, self.limit).await {
                Ok(records) => FeedSnapshot {
                    logs: records.map(FeedEntry::from).collect(),
                    is_connected: true,
                    error: None,
                },
                Err(err) => {
                    tracing::warn!(target: "feed", error = %err, "Feed refresh failed");
                    FeedSnapshot {
                        logs: previous.logs,
                        is_connected: false,
                        error: Some(err.to_string()),
                    }
                }
            },
        };
        self.tx.send_replace(next.clone());
        next
    }

    /// Refreshes every poll interval until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = self.refresh().await;
                    tracing::debug!(target: "feed", entries = snapshot.logs.len(), connected = snapshot.is_connected, "Feed refreshed");
                }
            }
        }
    }
}
