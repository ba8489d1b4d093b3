// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::seen_cache::SeenCache;
use crate::domain::constants::SEEN_CONTENT_IDS_CAP;
use crate::domain::error::AppError;
use crate::domain::ports::{DataStore, SchemaStore};
use crate::domain::types::{
    AuditRecord, ContentId, SchemaId, SchemaRegistration, StoredEntry, StreamUpdateRecord,
};
use crate::infrastructure::data::records::{SchemaRecord, decode_record, encode_record};
use crate::infrastructure::data::schema::{RecordSchema, SchemaCache};
use crate::infrastructure::data::streams::is_already_registered;
use alloy::primitives::{Address, B256, Bytes};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishReceipt {
    pub content_id: ContentId,
    /// Hash of the submitted write; the write is not yet confirmed when this
    /// is returned, and the content id already counts as published. `None`
    /// when this process already wrote the same content id.
    pub write_handle: Option<B256>,
}

/// Writes keeper decisions to a schema-typed store and reads them back.
pub struct AuditLogPublisher {
    schemas: Arc<dyn SchemaStore>,
    data: Arc<dyn DataStore>,
    publisher: Address,
    cache: SchemaCache,
    published: SeenCache<ContentId>,
}

impl AuditLogPublisher {
    pub fn new(schemas: Arc<dyn SchemaStore>, data: Arc<dyn DataStore>, publisher: Address) -> Self {
        Self {
            schemas,
            data,
            publisher,
            cache: SchemaCache::new(),
            published: SeenCache::new(SEEN_CONTENT_IDS_CAP),
        }
    }

    pub fn publisher(&self) -> Address {
        self.publisher
    }

    pub fn schema_id(&self, schema: &RecordSchema) -> SchemaId {
        self.cache.resolve(schema)
    }

    /// Asks the store for the id of `schema` and refuses a different id than the
    /// local hash, since records would otherwise land under an unregistered id.
    pub async fn verify_schema_id(&self, schema: &RecordSchema) -> Result<SchemaId, AppError> {
        let local = self.schema_id(schema);
        let remote = self.schemas.compute_schema_id(schema.canonical()).await?;
        if remote != local {
            tracing::error!(
                target: "audit",
                schema = schema.name(),
                local = %local,
                store = %remote,
                "Store computes a different schema id"
            );
            return Err(AppError::Config(format!(
                "schema {} id mismatch: local {local:#x}, store {remote:#x}",
                schema.name()
            )));
        }
        Ok(local)
    }

    /// Registers `schema` unless it already exists. Returns the write handle if
    /// anything was written.
    pub async fn register_schema(&self, schema: &RecordSchema) -> Result<Option<B256>, AppError> {
        let id = self.verify_schema_id(schema).await?;
        if self.schemas.is_schema_registered(id).await? {
            tracing::info!(target: "audit", schema = schema.name(), id = %id, "Schema already registered");
            return Ok(None);
        }
        let registration = SchemaRegistration {
            name: schema.name().to_string(),
            canonical_definition: schema.canonical().to_string(),
            parent_schema_id: B256::ZERO,
        };
        match self.schemas.register_schemas(vec![registration], true).await {
            Ok(handle) => {
                tracing::info!(target: "audit", schema = schema.name(), id = %id, tx = ?handle, "Schema registered");
                Ok(handle)
            }
            Err(err) if is_already_registered(&err.to_string()) => {
                tracing::info!(target: "audit", schema = schema.name(), "Schema already registered");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Registers every schema the keeper writes.
    pub async fn register_all(&self) -> Result<(), AppError> {
        self.register_schema(AuditRecord::schema()).await?;
        self.register_schema(StreamUpdateRecord::schema()).await?;
        Ok(())
    }

    pub fn encode<R: SchemaRecord>(&self, record: &R) -> Result<Bytes, AppError> {
        encode_record(record)
    }

    pub async fn publish(&self, record: &AuditRecord) -> Result<PublishReceipt, AppError> {
        self.publish_record(record).await
    }

    pub async fn publish_stream_update(
        &self,
        record: &StreamUpdateRecord,
    ) -> Result<PublishReceipt, AppError> {
        self.publish_record(record).await
    }

    async fn publish_record<R: SchemaRecord>(&self, record: &R) -> Result<PublishReceipt, AppError> {
        let content_id = record.content_id();
        if self.published.contains(&content_id) {
            tracing::debug!(target: "audit", content_id = %content_id, "Already published; skipping write");
            return Ok(PublishReceipt {
                content_id,
                write_handle: None,
            });
        }

        let payload = encode_record(record)?;
        let entry = StoredEntry {
            id: content_id,
            schema_id: self.schema_id(R::schema()),
            payload,
        };
        let handle = self.data.set(vec![entry]).await.map_err(|e| match e {
            AppError::Publish(_) => e,
            other => AppError::Publish(other.to_string()),
        })?;
        self.published.remember(content_id).await;
        Ok(PublishReceipt {
            content_id,
            write_handle: Some(handle),
        })
    }

    /// Up to `limit` records by `publisher`, newest first. Undecodable entries
    /// are skipped with a warning.
    pub async fn list_recent<R: SchemaRecord>(
        &self,
        publisher: Address,
        limit: usize,
    ) -> Result<RecentRecords<R>, AppError> {
        let schema_id = self.schema_id(R::schema());
        let raw = self
            .data
            .get_all_for_publisher_and_schema(schema_id, publisher)
            .await?;
        Ok(RecentRecords::new(raw, limit))
    }
}

/// Lazily decoded, newest-first view over one fetch of raw entries.
pub struct RecentRecords<R> {
    raw: std::iter::Rev<std::vec::IntoIter<Bytes>>,
    remaining: usize,
    skipped: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: SchemaRecord> RecentRecords<R> {
    fn new(raw: Vec<Bytes>, limit: usize) -> Self {
        Self {
            raw: raw.into_iter().rev(),
            remaining: limit,
            skipped: 0,
            _record: PhantomData,
        }
    }

    /// Entries skipped so far because they did not decode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: SchemaRecord> Iterator for RecentRecords<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        while self.remaining > 0 {
            let payload = self.raw.next()?;
            match decode_record::<R>(&payload) {
                Ok(record) => {
                    self.remaining -= 1;
                    return Some(record);
                }
                Err(err) => {
                    self.skipped += 1;
                    tracing::warn!(
                        target: "audit",
                        schema = R::schema().name(),
                        len = payload.len(),
                        error = %err,
                        "Skipping undecodable entry"
                    );
                }
            }
        }
        None
    }
}
