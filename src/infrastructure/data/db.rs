// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::types::{AuditRecord, ContentId};
use crate::infrastructure::data::rows::{BatchExecutionRow, BatchStatus, DecisionRow};
use alloy::primitives::{B256, U256};
use sqlx::{
    Pool, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

/// Local decision journal. Never authoritative; the data stream is.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Outcome of one batch as written to the journal.
#[derive(Clone, Debug)]
pub struct BatchOutcome<'a> {
    pub content_id: ContentId,
    pub batch_index: usize,
    pub stream_ids: &'a [U256],
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub status: BatchStatus,
    pub error: Option<String>,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?
            .create_if_missing(true);

        // An in-memory database lives per connection; keep it to one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Upsert by content id; a later publish receipt fills in `publish_tx`.
    pub async fn record_decision(
        &self,
        content_id: ContentId,
        record: &AuditRecord,
        publish_tx: Option<B256>,
    ) -> Result<(), AppError> {
        let timestamp_ms = i64::try_from(record.timestamp)
            .map_err(|e| AppError::Storage(format!("timestamp out of range: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO keeper_decisions (
                content_id, timestamp_ms, decision, fee_price_wei,
                expected_profit, batch_size, reason, publish_tx
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                publish_tx = COALESCE(excluded.publish_tx, keeper_decisions.publish_tx)
            "#,
        )
        .bind(content_id.to_string())
        .bind(timestamp_ms)
        .bind(record.decision.as_str())
        .bind(record.fee_price.to_string())
        .bind(&record.expected_profit)
        .bind(i64::from(record.batch_size))
        .bind(&record.reason)
        .bind(publish_tx.map(|h| h.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Decision upsert failed: {}", e)))?;
        Ok(())
    }

    pub async fn record_batch(&self, outcome: &BatchOutcome<'_>) -> Result<i64, AppError> {
        let stream_ids = outcome
            .stream_ids
            .iter()
            .map(U256::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let block = outcome
            .block_number
            .map(i64::try_from)
            .transpose()
            .map_err(|e| AppError::Storage(format!("block number out of range: {e}")))?;
        let row = sqlx::query(
            r#"
            INSERT INTO batch_executions (
                content_id, batch_index, stream_ids, tx_hash, block_number, status, error
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(outcome.content_id.to_string())
        .bind(outcome.batch_index as i64)
        .bind(stream_ids)
        .bind(outcome.tx_hash.map(|h| h.to_string()))
        .bind(block)
        .bind(outcome.status.as_str())
        .bind(outcome.error.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Batch insert failed: {}", e)))?;
        let id: i64 = row.get("id");
        Ok(id)
    }

    pub async fn recent_decisions(&self, limit: i64) -> Result<Vec<DecisionRow>, AppError> {
        let rows = sqlx::query_as::<_, DecisionRow>(
            "SELECT * FROM keeper_decisions ORDER BY timestamp_ms DESC LIMIT ?",
        )
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Query failed: {}", e)))?;
        Ok(rows)
    }

    pub async fn batches_for(&self, content_id: ContentId) -> Result<Vec<BatchExecutionRow>, AppError> {
        let rows = sqlx::query_as::<_, BatchExecutionRow>(
            "SELECT * FROM batch_executions WHERE content_id = ? ORDER BY batch_index ASC, id ASC",
        )
        .bind(content_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Query failed: {}", e)))?;
        Ok(rows)
    }
}
