// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::domain::error::AppError;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::Address;
use alloy::providers::Provider;
use std::future::Future;
use tokio::sync::Mutex;

/// Single submission lane for one signing identity.
///
/// Every state-changing transaction of the keeper goes through [`submit`],
/// which holds the lane for the duration of the send so two writers never
/// race for a nonce. A failed send drops the cached nonce; the next
/// submission resyncs from the node's pending count.
///
/// [`submit`]: NonceManager::submit
pub struct NonceManager {
    provider: HttpProvider,
    address: Address,
    retry: RetryPolicy,
    next: Mutex<Option<u64>>,
}

impl NonceManager {
    pub fn new(provider: HttpProvider, address: Address, retry: RetryPolicy) -> Self {
        Self {
            provider,
            address,
            retry,
            next: Mutex::new(None),
        }
    }

    pub async fn submit<F, Fut, T>(&self, label: &str, send: F) -> Result<T, AppError>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut next = self.next.lock().await;
        let nonce = match *next {
            Some(n) => n,
            None => self.fetch_pending().await?,
        };
        match send(nonce).await {
            Ok(out) => {
                *next = Some(nonce.saturating_add(1));
                Ok(out)
            }
            Err(err) => {
                tracing::debug!(target: "ledger", label, nonce, error = %err, "send failed; nonce will resync");
                *next = None;
                Err(err)
            }
        }
    }

    /// Seeds the lane without a round trip.
    pub async fn seed(&self, nonce: u64) {
        *self.next.lock().await = Some(nonce);
    }

    pub async fn cached(&self) -> Option<u64> {
        *self.next.lock().await
    }

    async fn fetch_pending(&self) -> Result<u64, AppError> {
        let provider = self.provider.clone();
        let address = self.address;
        retry_async(
            move |_| {
                let provider = provider.clone();
                async move { provider.get_transaction_count(address).pending().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("Failed to fetch nonce: {}", e)))
    }
}
