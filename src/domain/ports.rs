// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! Capabilities the keeper consumes from the outside world. The chain-backed
//! implementations live under `infrastructure`; tests substitute in-process ones.

use crate::domain::error::AppError;
use crate::domain::types::{BatchReceipt, SchemaId, SchemaRegistration, StoredEntry};
use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn active_stream_ids(&self) -> Result<Vec<U256>, AppError>;
}

#[async_trait]
pub trait FeeOracle: Send + Sync {
    /// Current network fee price in wei per gas unit.
    async fn fee_price(&self) -> Result<u128, AppError>;
}

#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit_batch_update(&self, stream_ids: &[U256]) -> Result<B256, AppError>;

    /// Implementations must give up after a bounded wait.
    async fn await_confirmation(&self, tx_hash: B256) -> Result<BatchReceipt, AppError>;
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Returns `None` when nothing had to be written.
    async fn register_schemas(
        &self,
        schemas: Vec<SchemaRegistration>,
        ignore_already_registered: bool,
    ) -> Result<Option<B256>, AppError>;

    async fn compute_schema_id(&self, canonical_definition: &str) -> Result<SchemaId, AppError>;

    async fn is_schema_registered(&self, schema_id: SchemaId) -> Result<bool, AppError>;
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Upsert by entry id. Returns a write handle.
    async fn set(&self, entries: Vec<StoredEntry>) -> Result<B256, AppError>;

    /// Raw payloads in publication order (oldest first).
    async fn get_all_for_publisher_and_schema(
        &self,
        schema_id: SchemaId,
        publisher: Address,
    ) -> Result<Vec<Bytes>, AppError>;
}
