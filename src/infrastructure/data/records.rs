// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{KEEPER_LOG_ID_PREFIX, STREAM_UPDATE_ID_PREFIX};
use crate::domain::error::AppError;
use crate::domain::types::{AuditRecord, ContentId, StreamUpdateRecord};
use crate::infrastructure::data::schema::RecordSchema;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{U256, keccak256};
use std::fmt::Display;
use std::sync::LazyLock;

static KEEPER_LOG: LazyLock<RecordSchema> = LazyLock::new(RecordSchema::keeper_log);
static STREAM_UPDATE: LazyLock<RecordSchema> = LazyLock::new(RecordSchema::stream_update);

/// A record type bound to one schema.
pub trait SchemaRecord: Sized {
    fn schema() -> &'static RecordSchema;

    /// Field values in schema order.
    fn to_values(&self) -> Vec<DynSolValue>;

    fn from_values(values: Vec<DynSolValue>) -> Result<Self, AppError>;

    /// Deterministic primary key derived from the distinguishing fields.
    fn content_id(&self) -> ContentId;
}

pub fn content_id(prefix: &str, first: impl Display, second: impl Display) -> ContentId {
    keccak256(format!("{prefix}-{first}-{second}").as_bytes())
}

impl SchemaRecord for AuditRecord {
    fn schema() -> &'static RecordSchema {
        &KEEPER_LOG
    }

    fn to_values(&self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Uint(U256::from(self.timestamp), 64),
            DynSolValue::String(self.decision.as_str().to_string()),
            DynSolValue::Uint(self.fee_price, 256),
            DynSolValue::String(self.expected_profit.clone()),
            DynSolValue::Uint(U256::from(self.batch_size), 32),
            DynSolValue::String(self.reason.clone()),
        ]
    }

    fn from_values(values: Vec<DynSolValue>) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(Self::schema(), values);
        let timestamp = fields.uint_u64()?;
        let decision = fields.string()?.parse()?;
        let fee_price = fields.uint()?;
        let expected_profit = fields.string()?;
        let batch_size = u32::try_from(fields.uint_u64()?)
            .map_err(|_| AppError::Decode("batchSize exceeds uint32".into()))?;
        let reason = fields.string()?;
        fields.finish()?;
        Ok(Self {
            timestamp,
            decision,
            fee_price,
            expected_profit,
            batch_size,
            reason,
        })
    }

    fn content_id(&self) -> ContentId {
        content_id(KEEPER_LOG_ID_PREFIX, self.timestamp, self.decision)
    }
}

impl SchemaRecord for StreamUpdateRecord {
    fn schema() -> &'static RecordSchema {
        &STREAM_UPDATE
    }

    fn to_values(&self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Uint(self.stream_id, 256),
            DynSolValue::Uint(self.new_balance, 256),
            DynSolValue::String(self.status.clone()),
            DynSolValue::Uint(U256::from(self.timestamp), 64),
        ]
    }

    fn from_values(values: Vec<DynSolValue>) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(Self::schema(), values);
        let stream_id = fields.uint()?;
        let new_balance = fields.uint()?;
        let status = fields.string()?;
        let timestamp = fields.uint_u64()?;
        fields.finish()?;
        Ok(Self {
            stream_id,
            new_balance,
            status,
            timestamp,
        })
    }

    fn content_id(&self) -> ContentId {
        content_id(STREAM_UPDATE_ID_PREFIX, self.stream_id, self.timestamp)
    }
}

/// Walks decoded values in schema order; any mismatch is a decode failure.
struct FieldReader {
    schema: &'static RecordSchema,
    values: std::vec::IntoIter<DynSolValue>,
    index: usize,
}

impl FieldReader {
    fn new(schema: &'static RecordSchema, values: Vec<DynSolValue>) -> Self {
        Self {
            schema,
            values: values.into_iter(),
            index: 0,
        }
    }

    fn next(&mut self) -> Result<DynSolValue, AppError> {
        let value = self.values.next().ok_or_else(|| {
            AppError::Decode(format!(
                "{}: missing field #{}",
                self.schema.name(),
                self.index
            ))
        })?;
        self.index += 1;
        Ok(value)
    }

    fn mismatch(&self, expected: &str) -> AppError {
        let field = self
            .schema
            .fields()
            .get(self.index.saturating_sub(1))
            .map(|f| f.name.as_str())
            .unwrap_or("?");
        AppError::Decode(format!(
            "{}: field {field} is not a {expected}",
            self.schema.name()
        ))
    }

    fn uint(&mut self) -> Result<U256, AppError> {
        match self.next()? {
            DynSolValue::Uint(v, _) => Ok(v),
            _ => Err(self.mismatch("uint")),
        }
    }

    fn uint_u64(&mut self) -> Result<u64, AppError> {
        let v = self.uint()?;
        u64::try_from(v).map_err(|_| self.mismatch("uint64"))
    }

    fn string(&mut self) -> Result<String, AppError> {
        match self.next()? {
            DynSolValue::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    fn finish(mut self) -> Result<(), AppError> {
        match self.values.next() {
            None => Ok(()),
            Some(_) => Err(AppError::Decode(format!(
                "{}: trailing fields",
                self.schema.name()
            ))),
        }
    }
}

pub fn encode_record<R: SchemaRecord>(record: &R) -> Result<alloy::primitives::Bytes, AppError> {
    R::schema().encode(&record.to_values())
}

pub fn decode_record<R: SchemaRecord>(payload: &[u8]) -> Result<R, AppError> {
    R::from_values(R::schema().decode(payload)?)
}
