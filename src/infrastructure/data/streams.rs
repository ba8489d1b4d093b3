// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::domain::error::AppError;
use crate::domain::ports::{DataStore, SchemaStore};
use crate::domain::types::{SchemaId, SchemaRegistration, StoredEntry};
use crate::infrastructure::data::contracts::IDataStreams;
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use std::sync::Arc;

/// On-chain schema registry and data stream store.
///
/// Built without a nonce lane it is read-only, which is all the feed needs.
pub struct StreamsClient {
    contract: IDataStreams::IDataStreamsInstance<HttpProvider>,
    lane: Option<Arc<NonceManager>>,
    retry: RetryPolicy,
}

impl StreamsClient {
    pub fn new(
        address: Address,
        provider: HttpProvider,
        lane: Option<Arc<NonceManager>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            contract: IDataStreams::new(address, provider),
            lane,
            retry,
        }
    }

    fn lane(&self) -> Result<&NonceManager, AppError> {
        self.lane
            .as_deref()
            .ok_or_else(|| AppError::Config("streams client has no signing identity".into()))
    }
}

/// A registration revert that only says the schema exists.
pub fn is_already_registered(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already") || lower.contains("schemaalreadyexists")
}

#[async_trait]
impl SchemaStore for StreamsClient {
    async fn register_schemas(
        &self,
        schemas: Vec<SchemaRegistration>,
        ignore_already_registered: bool,
    ) -> Result<Option<B256>, AppError> {
        if schemas.is_empty() {
            return Ok(None);
        }
        let payload: Vec<IDataStreams::DataSchema> = schemas
            .into_iter()
            .map(|s| IDataStreams::DataSchema {
                schemaName: s.name,
                schema: s.canonical_definition,
                parentSchemaId: s.parent_schema_id,
            })
            .collect();
        let sent = self
            .lane()?
            .submit("registerSchemas", |nonce| async move {
                let pending = self
                    .contract
                    .registerSchemas(payload, ignore_already_registered)
                    .nonce(nonce)
                    .send()
                    .await
                    .map_err(|e| AppError::Publish(format!("registerSchemas rejected: {e}")))?;
                Ok(*pending.tx_hash())
            })
            .await;
        match sent {
            Ok(hash) => Ok(Some(hash)),
            Err(err) if ignore_already_registered && is_already_registered(&err.to_string()) => {
                tracing::info!(target: "audit", "Schema already registered");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn compute_schema_id(&self, canonical_definition: &str) -> Result<SchemaId, AppError> {
        let contract = self.contract.clone();
        let definition = canonical_definition.to_string();
        retry_async(
            move |_| {
                let c = contract.clone();
                let d = definition.clone();
                async move { c.computeSchemaId(d).call().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("computeSchemaId failed: {}", e)))
    }

    async fn is_schema_registered(&self, schema_id: SchemaId) -> Result<bool, AppError> {
        let contract = self.contract.clone();
        retry_async(
            move |_| {
                let c = contract.clone();
                async move { c.isSchemaRegistered(schema_id).call().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("isSchemaRegistered failed: {}", e)))
    }
}

#[async_trait]
impl DataStore for StreamsClient {
    async fn set(&self, entries: Vec<StoredEntry>) -> Result<B256, AppError> {
        let streams: Vec<IDataStreams::DataStream> = entries
            .into_iter()
            .map(|e| IDataStreams::DataStream {
                id: e.id,
                schemaId: e.schema_id,
                data: e.payload,
            })
            .collect();
        self.lane()?
            .submit("set", |nonce| async move {
                let pending = self
                    .contract
                    .set(streams)
                    .nonce(nonce)
                    .send()
                    .await
                    .map_err(|e| AppError::Publish(format!("set rejected: {e}")))?;
                Ok(*pending.tx_hash())
            })
            .await
    }

    async fn get_all_for_publisher_and_schema(
        &self,
        schema_id: SchemaId,
        publisher: Address,
    ) -> Result<Vec<Bytes>, AppError> {
        let contract = self.contract.clone();
        retry_async(
            move |_| {
                let c = contract.clone();
                async move { c.getAllPublisherDataForSchema(schema_id, publisher).call().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("getAllPublisherDataForSchema failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::network::provider::ConnectionFactory;
    use std::time::Duration;

    #[test]
    fn recognises_already_registered_reverts() {
        assert!(is_already_registered("execution reverted: SchemaAlreadyExists(0x12..)"));
        assert!(is_already_registered("Schema already registered"));
        assert!(!is_already_registered("insufficient funds for gas"));
    }

    #[tokio::test]
    async fn read_only_client_cannot_write() {
        let provider = ConnectionFactory::http("http://127.0.0.1:1").expect("provider");
        let client = StreamsClient::new(
            Address::repeat_byte(0x22),
            provider,
            None,
            RetryPolicy::new(1, Duration::from_millis(1)),
        );
        let err = client.set(Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
