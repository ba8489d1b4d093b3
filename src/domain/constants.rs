// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

// =============================================================================
// RECORD SCHEMAS
// =============================================================================

/// Canonical definition strings must stay byte-identical to what was registered.
pub const KEEPER_LOG_SCHEMA_NAME: &str = "Lucidpay_Keeper_Log_v1";
pub const KEEPER_LOG_SCHEMA_DEF: &str = "uint64 timestamp, string decision, uint256 feePrice, string expectedProfit, uint32 batchSize, string reason";

pub const STREAM_UPDATE_SCHEMA_NAME: &str = "Lucidpay_Update_v1";
pub const STREAM_UPDATE_SCHEMA_DEF: &str =
    "uint256 streamId, uint256 newBalance, string status, uint64 timestamp";

pub const KEEPER_LOG_ID_PREFIX: &str = "keeper";
pub const STREAM_UPDATE_ID_PREFIX: &str = "stream";

/// Recently published content ids remembered by the publisher.
pub const SEEN_CONTENT_IDS_CAP: usize = 1_024;

// =============================================================================
// NETWORK
// =============================================================================

pub const DEFAULT_RPC_URL: &str = "https://dream-rpc.somnia.network";

// =============================================================================
// GAS MODEL
// =============================================================================

/// Intrinsic cost of any transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Fixed cost of entering `batchUpdateStreams` (dispatch, loop setup, event).
pub const BATCH_CALL_OVERHEAD_GAS: u64 = 30_000;
/// Marginal cost of settling one stream inside a batch.
pub const BATCH_ITEM_GAS: u64 = 25_000;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

pub const WEI_PER_NATIVE: f64 = 1e18;
pub const WEI_PER_GWEI: f64 = 1e9;

// =============================================================================
// LOOP & FEED
// =============================================================================

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FEED_LIMIT: usize = 50;
/// Upper bound for the backoff between receipt polls.
pub const MAX_RECEIPT_POLL_MS: u64 = 8_000;

/// `expectedProfit` text for records that carry no profit figure.
pub const ZERO_PROFIT_TEXT: &str = "0";
/// Decimal places used when rendering `expectedProfit`.
pub const PROFIT_DECIMALS: usize = 6;
