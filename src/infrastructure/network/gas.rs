// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::{RetryPolicy, retry_async};
use crate::common::time_utils::current_unix_millis;
use crate::domain::error::AppError;
use crate::domain::ports::FeeOracle;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A fee reading and when it was taken (unix millis).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeReading {
    pub wei_per_gas: u128,
    pub observed_at_ms: u64,
}

#[derive(Clone)]
pub struct GasOracle {
    provider: HttpProvider,
    retry: RetryPolicy,
    last_good: Arc<Mutex<Option<FeeReading>>>,
}

impl GasOracle {
    pub fn new(provider: HttpProvider, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            last_good: Arc::new(Mutex::new(None)),
        }
    }

    /// Most recent successful reading. Diagnostics only; never fed back into decisions.
    pub fn last_good(&self) -> Option<FeeReading> {
        self.last_good.lock().ok().and_then(|guard| *guard)
    }

    async fn with_retry_gas_price(&self) -> Result<u128, AppError> {
        let provider = self.provider.clone();
        retry_async(
            move |_| {
                let provider = provider.clone();
                async move { provider.get_gas_price().await }
            },
            self.retry,
        )
        .await
        .map_err(|e| AppError::Connection(format!("Gas price failed: {}", e)))
    }
}

#[async_trait]
impl FeeOracle for GasOracle {
    async fn fee_price(&self) -> Result<u128, AppError> {
        match self.with_retry_gas_price().await {
            Ok(wei_per_gas) => {
                if let Ok(mut guard) = self.last_good.lock() {
                    *guard = Some(FeeReading {
                        wei_per_gas,
                        observed_at_ms: current_unix_millis(),
                    });
                }
                tracing::debug!(target: "gas", wei_per_gas, "fee price observed");
                Ok(wei_per_gas)
            }
            Err(err) => Err(stale_reading_error(err, self.last_good(), current_unix_millis())),
        }
    }
}

fn stale_reading_error(err: AppError, last_good: Option<FeeReading>, now_ms: u64) -> AppError {
    match last_good {
        Some(reading) => AppError::Connection(format!(
            "{err} (last good reading {} wei, {}ms old, not reused)",
            reading.wei_per_gas,
            now_ms.saturating_sub(reading.observed_at_ms)
        )),
        None => err,
    }
}
