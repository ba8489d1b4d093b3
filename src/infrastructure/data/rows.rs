// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use chrono::NaiveDateTime;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct DecisionRow {
    pub content_id: String,
    pub timestamp_ms: i64,
    pub decision: String,
    pub fee_price_wei: String,
    pub expected_profit: String,
    pub batch_size: i64,
    pub reason: String,
    pub publish_tx: Option<String>,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, FromRow)]
pub struct BatchExecutionRow {
    pub id: i64,
    pub content_id: String,
    pub batch_index: i64,
    /// Comma-separated decimal stream ids.
    pub stream_ids: String,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub status: String,
    pub error: Option<String>,
    pub recorded_at: NaiveDateTime,
}

/// Terminal state of one submitted batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Confirmed,
    Reverted,
    Failed,
    TimedOut,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Confirmed => "confirmed",
            BatchStatus::Reverted => "reverted",
            BatchStatus::Failed => "failed",
            BatchStatus::TimedOut => "timed_out",
        }
    }
}
