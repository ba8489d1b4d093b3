// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::RetryPolicy;
use crate::domain::constants::{
    BATCH_CALL_OVERHEAD_GAS, BATCH_ITEM_GAS, DEFAULT_FEED_LIMIT, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RPC_URL, TX_BASE_GAS,
};
use crate::domain::error::AppError;
use crate::services::keeper::optimizer::{OptimizerParams, PricingInputs};
use alloy::primitives::Address;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct KeeperSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    // Identity and targets
    #[serde(default)]
    pub keeper_private_key: String,
    pub keeper_address: Option<Address>,
    pub lucidpay_address: Option<Address>,
    pub streams_address: Option<Address>,
    pub rpc_url: Option<String>,

    // Loop
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default = "default_rpc_retry_attempts")]
    pub rpc_retry_attempts: usize,

    // Economics
    #[serde(default = "default_reward_rate_per_item")]
    pub reward_rate_per_item: f64,
    /// Unit price of the reward asset.
    #[serde(default = "default_reference_price_a")]
    pub reference_price_a: f64,
    /// Unit price of the fee asset.
    #[serde(default = "default_reference_price_b")]
    pub reference_price_b: f64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_batch_base_gas")]
    pub batch_base_gas: u64,
    #[serde(default = "default_batch_item_gas")]
    pub batch_item_gas: u64,
    #[serde(default)]
    pub min_margin_bps: u32,

    // Feed
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub feed_poll_secs: u64,
}

// Defaults
fn default_false() -> bool {
    false
}
fn default_database_url() -> String {
    "sqlite://keeper.db".to_string()
}
fn default_metrics_port() -> u16 {
    9000
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_receipt_poll_ms() -> u64 {
    1_000
}
fn default_receipt_timeout_ms() -> u64 {
    60_000
}
fn default_rpc_retry_attempts() -> usize {
    3
}
fn default_reward_rate_per_item() -> f64 {
    0.001
}
fn default_reference_price_a() -> f64 {
    2000.0
}
fn default_reference_price_b() -> f64 {
    20.0
}
fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}
fn default_batch_base_gas() -> u64 {
    TX_BASE_GAS + BATCH_CALL_OVERHEAD_GAS
}
fn default_batch_item_gas() -> u64 {
    BATCH_ITEM_GAS
}
fn default_feed_limit() -> usize {
    DEFAULT_FEED_LIMIT
}

impl KeeperSettings {
    /// Loads and validates everything the keeper loop needs.
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        let settings = Self::read_with_path(path)?;
        settings.validate_keeper()?;
        Ok(settings)
    }

    /// Loads without requiring a signing identity (read-only tools).
    pub fn read_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > file.
        builder = builder.add_source(Environment::default());

        let settings: KeeperSettings = builder.build()?.try_deserialize()?;
        settings.validate_common()?;
        Ok(settings)
    }

    fn validate_common(&self) -> Result<(), AppError> {
        Url::parse(&self.rpc_url_value())
            .map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        for (name, value) in [
            ("REFERENCE_PRICE_A", self.reference_price_a),
            ("REFERENCE_PRICE_B", self.reference_price_b),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::Config(format!("{name} must be a positive number")));
            }
        }
        if !self.reward_rate_per_item.is_finite() || self.reward_rate_per_item < 0.0 {
            return Err(AppError::Config(
                "REWARD_RATE_PER_ITEM must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_keeper(&self) -> Result<(), AppError> {
        if self.keeper_private_key.trim().is_empty() {
            return Err(AppError::Config("KEEPER_PRIVATE_KEY is missing".to_string()));
        }
        self.lucidpay_address()?;
        Ok(())
    }

    pub fn lucidpay_address(&self) -> Result<Address, AppError> {
        match self.lucidpay_address {
            Some(addr) if addr != Address::ZERO => Ok(addr),
            _ => Err(AppError::Config("LUCIDPAY_ADDRESS is missing".to_string())),
        }
    }

    /// `RPC_URL`, then `SOMNIA_RPC_URL`, then the public testnet endpoint.
    pub fn rpc_url_value(&self) -> String {
        self.rpc_url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                std::env::var("SOMNIA_RPC_URL")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(100))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms).max(self.receipt_poll())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.rpc_retry_attempts, Duration::from_millis(100))
    }

    pub fn optimizer_params(&self) -> OptimizerParams {
        OptimizerParams {
            max_batch_size: self.max_batch_size.max(1),
            batch_base_gas: self.batch_base_gas,
            batch_item_gas: self.batch_item_gas,
            min_margin_bps: self.min_margin_bps,
        }
    }

    pub fn pricing(&self) -> PricingInputs {
        PricingInputs {
            reward_rate_per_item: self.reward_rate_per_item,
            reference_price_a: self.reference_price_a,
            reference_price_b: self.reference_price_b,
        }
    }

    /// `None` when the journal is turned off with an empty `DATABASE_URL`.
    pub fn journal_url(&self) -> Option<&str> {
        Some(self.database_url.trim()).filter(|s| !s.is_empty())
    }

    pub fn feed_poll(&self) -> Duration {
        Duration::from_secs(self.feed_poll_secs.max(1))
    }

    pub fn feed_limit_value(&self) -> usize {
        self.feed_limit.max(1)
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
