// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::domain::constants::MAX_RECEIPT_POLL_MS;
use crate::domain::error::AppError;
use crate::domain::ports::{BatchSubmitter, StreamSource};
use crate::domain::types::BatchReceipt;
use crate::infrastructure::data::contracts::ILucidPay;
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct ReceiptWait {
    pub poll: Duration,
    pub timeout: Duration,
}

impl ReceiptWait {
    /// Poll delay after `errors` consecutive lookup failures.
    pub fn backoff(&self, errors: u32) -> Duration {
        let cap = Duration::from_millis(MAX_RECEIPT_POLL_MS).max(self.poll);
        self.poll
            .saturating_mul(1u32 << errors.min(6))
            .min(cap)
    }
}

/// Client for the payment-stream contract.
pub struct LedgerClient {
    contract: ILucidPay::ILucidPayInstance<HttpProvider>,
    provider: HttpProvider,
    lane: Option<Arc<NonceManager>>,
    retry: RetryPolicy,
    wait: ReceiptWait,
}

impl LedgerClient {
    pub fn new(
        address: Address,
        provider: HttpProvider,
        lane: Option<Arc<NonceManager>>,
        retry: RetryPolicy,
        wait: ReceiptWait,
    ) -> Self {
        Self {
            contract: ILucidPay::new(address, provider.clone()),
            provider,
            lane,
            retry,
            wait,
        }
    }
}

#[async_trait]
impl StreamSource for LedgerClient {
    async fn active_stream_ids(&self) -> Result<Vec<U256>, AppError> {
        let contract = self.contract.clone();
        retry_async(
            move |_| {
                let c = contract.clone();
                async move { c.getActiveStreamIds().call().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("getActiveStreamIds failed: {}", e)))
    }
}

#[async_trait]
impl BatchSubmitter for LedgerClient {
    async fn submit_batch_update(&self, stream_ids: &[U256]) -> Result<B256, AppError> {
        let lane = self.lane.as_ref().ok_or_else(|| {
            AppError::Config("ledger client has no signing identity".into())
        })?;
        let ids = stream_ids.to_vec();
        let count = ids.len();
        lane.submit("batchUpdateStreams", |nonce| async move {
            let pending = self
                .contract
                .batchUpdateStreams(ids)
                .nonce(nonce)
                .send()
                .await
                .map_err(|e| AppError::Transaction {
                    hash: String::new(),
                    reason: format!("batchUpdateStreams({count} streams) rejected: {e}"),
                })?;
            Ok(*pending.tx_hash())
        })
        .await
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<BatchReceipt, AppError> {
        let started = Instant::now();
        let mut errors = 0u32;

        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(rcpt)) => {
                    return Ok(BatchReceipt {
                        tx_hash,
                        block_number: rcpt.block_number,
                        success: rcpt.status(),
                    });
                }
                Ok(None) => errors = 0,
                Err(e) => {
                    errors = errors.saturating_add(1);
                    tracing::debug!(
                        target: "ledger",
                        error = %e,
                        hash = %format!("{:#x}", tx_hash),
                        "Receipt lookup error; retrying"
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.wait.timeout {
                return Err(AppError::ConfirmationTimeout {
                    hash: format!("{:#x}", tx_hash),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            let delay = self.wait.backoff(errors).min(self.wait.timeout - elapsed);
            tokio::time::sleep(delay).await;
        }
    }
}
