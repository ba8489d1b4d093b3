// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Record schemas: an ordered list of typed fields rendered as a canonical
//! definition string. The schema id is keccak256 of that string, so two
//! schemas are the same schema exactly when their canonical strings match.

use crate::domain::constants::{KEEPER_LOG_SCHEMA_NAME, STREAM_UPDATE_SCHEMA_NAME};
use crate::domain::error::AppError;
use crate::domain::types::SchemaId;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Bytes, keccak256};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
}

impl FieldKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "address" => return Some(FieldKind::Address),
            "bool" => return Some(FieldKind::Bool),
            "string" => return Some(FieldKind::String),
            "bytes" => return Some(FieldKind::Bytes),
            _ => {}
        }
        if let Some(bits) = raw.strip_prefix("uint") {
            return parse_int_width(bits).map(FieldKind::Uint);
        }
        if let Some(bits) = raw.strip_prefix("int") {
            return parse_int_width(bits).map(FieldKind::Int);
        }
        if let Some(len) = raw.strip_prefix("bytes") {
            let len: usize = len.parse().ok()?;
            return (1..=32).contains(&len).then_some(FieldKind::FixedBytes(len));
        }
        None
    }

    /// Bit width for integers, byte length for fixed bytes.
    pub fn width(self) -> Option<usize> {
        match self {
            FieldKind::Uint(bits) | FieldKind::Int(bits) => Some(bits),
            FieldKind::FixedBytes(len) => Some(len),
            _ => None,
        }
    }

    pub fn sol_type(self) -> DynSolType {
        match self {
            FieldKind::Uint(bits) => DynSolType::Uint(bits),
            FieldKind::Int(bits) => DynSolType::Int(bits),
            FieldKind::Address => DynSolType::Address,
            FieldKind::Bool => DynSolType::Bool,
            FieldKind::String => DynSolType::String,
            FieldKind::Bytes => DynSolType::Bytes,
            FieldKind::FixedBytes(len) => DynSolType::FixedBytes(len),
        }
    }

    pub fn accepts(self, value: &DynSolValue) -> bool {
        match (self, value) {
            (FieldKind::Uint(bits), DynSolValue::Uint(v, size)) => {
                *size == bits && v.bit_len() <= bits
            }
            (FieldKind::Int(bits), DynSolValue::Int(_, size)) => *size == bits,
            (FieldKind::Address, DynSolValue::Address(_)) => true,
            (FieldKind::Bool, DynSolValue::Bool(_)) => true,
            (FieldKind::String, DynSolValue::String(_)) => true,
            (FieldKind::Bytes, DynSolValue::Bytes(_)) => true,
            (FieldKind::FixedBytes(len), DynSolValue::FixedBytes(_, size)) => *size == len,
            _ => false,
        }
    }
}

fn parse_int_width(bits: &str) -> Option<usize> {
    let bits: usize = bits.parse().ok()?;
    (bits > 0 && bits <= 256 && bits % 8 == 0).then_some(bits)
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Uint(bits) => write!(f, "uint{bits}"),
            FieldKind::Int(bits) => write!(f, "int{bits}"),
            FieldKind::Address => f.write_str("address"),
            FieldKind::Bool => f.write_str("bool"),
            FieldKind::String => f.write_str("string"),
            FieldKind::Bytes => f.write_str("bytes"),
            FieldKind::FixedBytes(len) => write!(f, "bytes{len}"),
        }
    }
}

fn describe(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Uint(_, bits) => format!("uint{bits}"),
        DynSolValue::Int(_, bits) => format!("int{bits}"),
        DynSolValue::Address(_) => "address".into(),
        DynSolValue::Bool(_) => "bool".into(),
        DynSolValue::String(_) => "string".into(),
        DynSolValue::Bytes(_) => "bytes".into(),
        DynSolValue::FixedBytes(_, len) => format!("bytes{len}"),
        _ => "composite".into(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
}

impl SchemaField {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    canonical: String,
    fields: Vec<SchemaField>,
}

impl RecordSchema {
    pub fn new(name: &str, fields: Vec<SchemaField>) -> Self {
        let canonical = fields
            .iter()
            .map(|f| format!("{} {}", f.kind, f.name))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name: name.to_string(),
            canonical,
            fields,
        }
    }

    /// Parses a definition that must already be in canonical form.
    pub fn parse(name: &str, definition: &str) -> Result<Self, AppError> {
        let mut fields = Vec::new();
        for part in definition.split(',') {
            let tokens: Vec<&str> = part.split_whitespace().collect();
            let [ty, field_name] = tokens.as_slice() else {
                return Err(AppError::Config(format!(
                    "schema {name}: malformed field {:?}",
                    part.trim()
                )));
            };
            let kind = FieldKind::parse(ty).ok_or_else(|| {
                AppError::Config(format!("schema {name}: unsupported type {ty:?}"))
            })?;
            if fields.iter().any(|f: &SchemaField| f.name == *field_name) {
                return Err(AppError::Config(format!(
                    "schema {name}: duplicate field {field_name:?}"
                )));
            }
            fields.push(SchemaField::new(field_name, kind));
        }
        let schema = Self::new(name, fields);
        if schema.canonical != definition {
            return Err(AppError::Config(format!(
                "schema {name}: definition is not canonical (expected {:?})",
                schema.canonical
            )));
        }
        Ok(schema)
    }

    pub fn keeper_log() -> Self {
        Self::new(
            KEEPER_LOG_SCHEMA_NAME,
            vec![
                SchemaField::new("timestamp", FieldKind::Uint(64)),
                SchemaField::new("decision", FieldKind::String),
                SchemaField::new("feePrice", FieldKind::Uint(256)),
                SchemaField::new("expectedProfit", FieldKind::String),
                SchemaField::new("batchSize", FieldKind::Uint(32)),
                SchemaField::new("reason", FieldKind::String),
            ],
        )
    }

    pub fn stream_update() -> Self {
        Self::new(
            STREAM_UPDATE_SCHEMA_NAME,
            vec![
                SchemaField::new("streamId", FieldKind::Uint(256)),
                SchemaField::new("newBalance", FieldKind::Uint(256)),
                SchemaField::new("status", FieldKind::String),
                SchemaField::new("timestamp", FieldKind::Uint(64)),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn id(&self) -> SchemaId {
        schema_id(&self.canonical)
    }

    pub fn encode(&self, values: &[DynSolValue]) -> Result<Bytes, AppError> {
        if values.len() != self.fields.len() {
            return Err(AppError::Encoding(format!(
                "schema {} expects {} fields, got {}",
                self.name,
                self.fields.len(),
                values.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(values) {
            if !field.kind.accepts(value) {
                return Err(AppError::Encoding(format!(
                    "schema {} field {} expects {}, got {}",
                    self.name,
                    field.name,
                    field.kind,
                    describe(value)
                )));
            }
        }
        Ok(DynSolValue::Tuple(values.to_vec()).abi_encode_params().into())
    }

    /// Strict decode: every field must be present and well-typed.
    pub fn decode(&self, payload: &[u8]) -> Result<Vec<DynSolValue>, AppError> {
        if payload.is_empty() {
            return Err(AppError::Decode(format!("{}: empty payload", self.name)));
        }
        let ty = DynSolType::Tuple(self.fields.iter().map(|f| f.kind.sol_type()).collect());
        let values = match ty.abi_decode_params(payload) {
            Ok(DynSolValue::Tuple(values)) => values,
            Ok(_) => {
                return Err(AppError::Decode(format!(
                    "{}: payload did not decode to a tuple",
                    self.name
                )));
            }
            Err(e) => return Err(AppError::Decode(format!("{}: {e}", self.name))),
        };
        if values.len() != self.fields.len() {
            return Err(AppError::Decode(format!(
                "{}: expected {} fields, decoded {}",
                self.name,
                self.fields.len(),
                values.len()
            )));
        }
        if let Some(field) = self
            .fields
            .iter()
            .zip(&values)
            .find_map(|(f, v)| (!f.kind.accepts(v)).then_some(f))
        {
            return Err(AppError::Decode(format!(
                "{}: field {} out of range for {}",
                self.name, field.name, field.kind
            )));
        }
        Ok(values)
    }
}

/// Pure function of the canonical definition.
pub fn schema_id(canonical_definition: &str) -> SchemaId {
    keccak256(canonical_definition.as_bytes())
}

/// Per-schema-name memo of schema ids, owned by whoever resolves ids.
///
/// Initialization is single-flight per name. A cached entry is only trusted
/// while the canonical string it was computed from still matches; otherwise
/// the id is recomputed from the schema at hand.
#[derive(Default)]
pub struct SchemaCache {
    entries: DashMap<String, Arc<OnceLock<(String, SchemaId)>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, schema: &RecordSchema) -> SchemaId {
        let slot = self
            .entries
            .entry(schema.name().to_string())
            .or_default()
            .clone();
        let (canonical, id) =
            slot.get_or_init(|| (schema.canonical().to_string(), schema.id()));
        if canonical == schema.canonical() {
            return *id;
        }
        tracing::warn!(
            target: "audit",
            schema = schema.name(),
            "Cached schema id belongs to a different definition; recomputing"
        );
        schema.id()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
