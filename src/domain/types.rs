// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{PROFIT_DECIMALS, ZERO_PROFIT_TEXT};
use crate::domain::error::AppError;
use alloy::primitives::{B256, Bytes, U256};
use std::fmt;
use std::str::FromStr;

/// keccak256 of a schema's canonical definition string.
pub type SchemaId = B256;
/// keccak256 of a record's distinguishing fields; primary key in the data store.
pub type ContentId = B256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// Round-robin tier assignment by position in the active set.
    pub fn for_position(index: usize) -> Self {
        match index % 3 {
            0 => PriorityTier::High,
            1 => PriorityTier::Medium,
            _ => PriorityTier::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
            PriorityTier::Low => "low",
        }
    }
}

/// One pending stream settlement. Built fresh every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkItem {
    pub id: U256,
    pub priority: PriorityTier,
    /// Reward for settling this stream, in units of reference asset A.
    pub reward_rate: f64,
    pub flow_rate: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    pub stream_ids: Vec<U256>,
}

impl Batch {
    pub fn new(stream_ids: Vec<U256>) -> Self {
        Self { stream_ids }
    }

    pub fn count(&self) -> usize {
        self.stream_ids.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    pub is_profitable: bool,
    pub decision: String,
    pub total_profit: f64,
    pub batches: Vec<Batch>,
}

impl OptimizationResult {
    pub fn not_profitable(decision: impl Into<String>, total_profit: f64) -> Self {
        Self {
            is_profitable: false,
            decision: decision.into(),
            total_profit: total_profit.min(0.0),
            batches: Vec::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.batches.iter().map(Batch::count).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    Execute,
    Skip,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Execute => "EXECUTE",
            Decision::Skip => "SKIP",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXECUTE" => Ok(Decision::Execute),
            "SKIP" => Ok(Decision::Skip),
            other => Err(AppError::Decode(format!("unknown decision {other:?}"))),
        }
    }
}

/// One keeper decision as written to the audit log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub decision: Decision,
    pub fee_price: U256,
    pub expected_profit: String,
    pub batch_size: u32,
    pub reason: String,
}

impl AuditRecord {
    pub fn from_result(timestamp: u64, fee_price: u128, result: &OptimizationResult) -> Self {
        if !result.is_profitable {
            return Self::skip(timestamp, fee_price, result.decision.clone());
        }
        Self {
            timestamp,
            decision: Decision::Execute,
            fee_price: U256::from(fee_price),
            expected_profit: format!("{:.*}", PROFIT_DECIMALS, result.total_profit),
            batch_size: u32::try_from(result.batches.len()).unwrap_or(u32::MAX),
            reason: result.decision.clone(),
        }
    }

    pub fn skip(timestamp: u64, fee_price: u128, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            decision: Decision::Skip,
            fee_price: U256::from(fee_price),
            expected_profit: ZERO_PROFIT_TEXT.to_string(),
            batch_size: 0,
            reason: reason.into(),
        }
    }
}

/// Post-settlement balance of a single stream (secondary schema).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamUpdateRecord {
    pub stream_id: U256,
    pub new_balance: U256,
    pub status: String,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: ContentId,
    pub schema_id: SchemaId,
    pub payload: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaRegistration {
    pub name: String,
    pub canonical_definition: String,
    pub parent_schema_id: SchemaId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}
