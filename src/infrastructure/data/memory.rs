// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::ports::{DataStore, SchemaStore};
use crate::domain::types::{ContentId, SchemaId, SchemaRegistration, StoredEntry};
use crate::infrastructure::data::schema::schema_id;
use alloy::primitives::{Address, B256, Bytes, keccak256};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process schema registry and data store for a single publisher.
///
/// Entries keep publication order. Writing an id that already exists under the
/// same schema replaces its payload in place, so one content id is one entry.
pub struct MemoryStreamStore {
    publisher: Address,
    schemas: DashMap<SchemaId, String>,
    entries: DashMap<(Address, SchemaId), Vec<(ContentId, Bytes)>>,
    writes: AtomicU64,
}

impl MemoryStreamStore {
    pub fn new(publisher: Address) -> Self {
        Self {
            publisher,
            schemas: DashMap::new(),
            entries: DashMap::new(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn publisher(&self) -> Address {
        self.publisher
    }

    /// Appends a raw payload without any schema check.
    pub fn push_raw(&self, schema_id: SchemaId, id: ContentId, payload: Bytes) {
        self.entries
            .entry((self.publisher, schema_id))
            .or_default()
            .push((id, payload));
    }

    pub fn entry_count(&self, schema_id: SchemaId) -> usize {
        self.entries
            .get(&(self.publisher, schema_id))
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn next_handle(&self) -> B256 {
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        keccak256(format!("memory-write-{n}").as_bytes())
    }
}

#[async_trait]
impl SchemaStore for MemoryStreamStore {
    async fn register_schemas(
        &self,
        schemas: Vec<SchemaRegistration>,
        ignore_already_registered: bool,
    ) -> Result<Option<B256>, AppError> {
        let mut wrote = false;
        for schema in schemas {
            let id = schema_id(&schema.canonical_definition);
            if self.schemas.contains_key(&id) {
                if ignore_already_registered {
                    continue;
                }
                return Err(AppError::Publish(format!(
                    "schema {} already registered",
                    schema.name
                )));
            }
            self.schemas.insert(id, schema.name);
            wrote = true;
        }
        Ok(wrote.then(|| self.next_handle()))
    }

    async fn compute_schema_id(&self, canonical_definition: &str) -> Result<SchemaId, AppError> {
        Ok(schema_id(canonical_definition))
    }

    async fn is_schema_registered(&self, schema_id: SchemaId) -> Result<bool, AppError> {
        Ok(self.schemas.contains_key(&schema_id))
    }
}

#[async_trait]
impl DataStore for MemoryStreamStore {
    async fn set(&self, entries: Vec<StoredEntry>) -> Result<B256, AppError> {
        if let Some(unknown) = entries
            .iter()
            .find(|e| !self.schemas.contains_key(&e.schema_id))
        {
            return Err(AppError::Publish(format!(
                "schema {} not registered",
                unknown.schema_id
            )));
        }
        for entry in entries {
            let mut slot = self
                .entries
                .entry((self.publisher, entry.schema_id))
                .or_default();
            match slot.iter_mut().find(|(id, _)| *id == entry.id) {
                Some(existing) => existing.1 = entry.payload,
                None => slot.push((entry.id, entry.payload)),
            }
        }
        Ok(self.next_handle())
    }

    async fn get_all_for_publisher_and_schema(
        &self,
        schema_id: SchemaId,
        publisher: Address,
    ) -> Result<Vec<Bytes>, AppError> {
        Ok(self
            .entries
            .get(&(publisher, schema_id))
            .map(|v| v.iter().map(|(_, payload)| payload.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> SchemaRegistration {
        SchemaRegistration {
            name: "Test_v1".into(),
            canonical_definition: "uint64 timestamp".into(),
            parent_schema_id: B256::ZERO,
        }
    }

    #[tokio::test]
    async fn registration_reports_whether_anything_was_written() {
        let store = MemoryStreamStore::new(Address::ZERO);
        assert!(store.register_schemas(vec![registration()], true).await.unwrap().is_some());
        assert!(store.register_schemas(vec![registration()], true).await.unwrap().is_none());
        assert!(store.register_schemas(vec![registration()], false).await.is_err());
    }

    #[tokio::test]
    async fn same_id_is_stored_once_and_keeps_its_position() {
        let store = MemoryStreamStore::new(Address::repeat_byte(1));
        store.register_schemas(vec![registration()], true).await.unwrap();
        let sid = schema_id("uint64 timestamp");
        let entry = |id: u8, byte: u8| StoredEntry {
            id: B256::repeat_byte(id),
            schema_id: sid,
            payload: Bytes::from(vec![byte]),
        };
        store.set(vec![entry(1, 0xa0), entry(2, 0xb0)]).await.unwrap();
        store.set(vec![entry(1, 0xa1)]).await.unwrap();

        let all = store
            .get_all_for_publisher_and_schema(sid, Address::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(all, vec![Bytes::from(vec![0xa1]), Bytes::from(vec![0xb0])]);
        assert!(
            store
                .get_all_for_publisher_and_schema(sid, Address::ZERO)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn writes_to_unregistered_schema_are_rejected() {
        let store = MemoryStreamStore::new(Address::ZERO);
        let err = store
            .set(vec![StoredEntry {
                id: B256::ZERO,
                schema_id: B256::repeat_byte(9),
                payload: Bytes::new(),
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
        assert_eq!(store.write_count(), 0);
    }
}
