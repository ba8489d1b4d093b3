// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! In-process stand-ins for the chain-facing ports.

#![allow(dead_code)]

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use lucid_keeper::data::db::Database;
use lucid_keeper::data::memory::MemoryStreamStore;
use lucid_keeper::data::records::SchemaRecord;
use lucid_keeper::domain::error::AppError;
use lucid_keeper::domain::ports::{BatchSubmitter, DataStore, FeeOracle, StreamSource};
use lucid_keeper::domain::types::{AuditRecord, BatchReceipt, SchemaId, StoredEntry};
use lucid_keeper::keeper::{
    AuditLogPublisher, BatchOptimizer, KeeperConfig, KeeperEngine, KeeperStats, OptimizerParams,
    PricingInputs,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn keeper() -> Address {
    Address::repeat_byte(0x4b)
}
/// 1 gwei: every stream is worth settling.
pub const CHEAP_FEE: u128 = 1_000_000_000;
/// 1e15 wei per gas: per-item gas cost dwarfs the reward.
pub const EXPENSIVE_FEE: u128 = 1_000_000_000_000_000;
pub const FIXED_NOW_MS: u64 = 1_760_000_000_000;

pub fn fixed_clock() -> u64 {
    FIXED_NOW_MS
}

pub fn stream_ids(n: u64) -> Vec<U256> {
    (1..=n).map(U256::from).collect()
}

pub fn pricing() -> PricingInputs {
    PricingInputs {
        reward_rate_per_item: 0.01,
        reference_price_a: 1.0,
        reference_price_b: 1.0,
    }
}

pub fn config() -> KeeperConfig {
    KeeperConfig {
        poll_interval: Duration::from_millis(20),
        pricing: pricing(),
        confirmation_timeout: Duration::from_millis(200),
        dry_run: false,
    }
}

pub fn optimizer(max_batch_size: usize) -> BatchOptimizer {
    BatchOptimizer::new(OptimizerParams {
        max_batch_size,
        ..OptimizerParams::default()
    })
}

/// How a scripted batch call behaves, by call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchScript {
    Confirm,
    RejectSubmit,
    Revert,
    /// Never produces a receipt.
    Hang,
}

/// Scripted stream source, fee oracle and batch submitter in one.
pub struct FakeLedger {
    streams: Mutex<Result<Vec<U256>, String>>,
    fee: Mutex<Result<u128, String>>,
    script: Mutex<Vec<BatchScript>>,
    submitted: Mutex<Vec<Vec<U256>>>,
    hanging: Mutex<HashSet<B256>>,
    reverting: Mutex<HashSet<B256>>,
    calls: AtomicUsize,
    cancel_after_submit: Mutex<Option<CancellationToken>>,
    confirm_delay: Mutex<Option<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Tracks how many confirmations are being awaited at once.
struct InFlight {
    current: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(current: &Arc<AtomicUsize>, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self {
            current: current.clone(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeLedger {
    pub fn new(streams: Vec<U256>, fee: u128) -> Self {
        Self {
            streams: Mutex::new(Ok(streams)),
            fee: Mutex::new(Ok(fee)),
            script: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            hanging: Mutex::new(HashSet::new()),
            reverting: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            cancel_after_submit: Mutex::new(None),
            confirm_delay: Mutex::new(None),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_streams(&self, message: &str) {
        *self.streams.lock().unwrap() = Err(message.to_string());
    }

    pub fn fail_fee(&self, message: &str) {
        *self.fee.lock().unwrap() = Err(message.to_string());
    }

    pub fn set_fee(&self, fee: u128) {
        *self.fee.lock().unwrap() = Ok(fee);
    }

    /// Calls past the end of the script confirm.
    pub fn script(&self, script: Vec<BatchScript>) {
        *self.script.lock().unwrap() = script;
    }

    /// Cancels `token` as soon as the first batch has been submitted.
    pub fn cancel_after_first_submit(&self, token: CancellationToken) {
        *self.cancel_after_submit.lock().unwrap() = Some(token);
    }

    /// Every confirmation takes at least `delay`.
    pub fn slow_confirmations(&self, delay: Duration) {
        *self.confirm_delay.lock().unwrap() = Some(delay);
    }

    pub fn max_concurrent_confirmations(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Vec<U256>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamSource for FakeLedger {
    async fn active_stream_ids(&self) -> Result<Vec<U256>, AppError> {
        self.streams
            .lock()
            .unwrap()
            .clone()
            .map_err(AppError::Connection)
    }
}

#[async_trait]
impl FeeOracle for FakeLedger {
    async fn fee_price(&self) -> Result<u128, AppError> {
        self.fee.lock().unwrap().clone().map_err(AppError::Connection)
    }
}

#[async_trait]
impl BatchSubmitter for FakeLedger {
    async fn submit_batch_update(&self, stream_ids: &[U256]) -> Result<B256, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .get(call)
            .copied()
            .unwrap_or(BatchScript::Confirm);
        if let Some(token) = self.cancel_after_submit.lock().unwrap().take() {
            token.cancel();
        }
        if step == BatchScript::RejectSubmit {
            return Err(AppError::Connection("nonce too low".into()));
        }
        self.submitted.lock().unwrap().push(stream_ids.to_vec());
        let hash = B256::from(U256::from(call as u64 + 1));
        match step {
            BatchScript::Hang => {
                self.hanging.lock().unwrap().insert(hash);
            }
            BatchScript::Revert => {
                self.reverting.lock().unwrap().insert(hash);
            }
            _ => {}
        }
        Ok(hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<BatchReceipt, AppError> {
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
        let delay = *self.confirm_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let hangs = self.hanging.lock().unwrap().contains(&tx_hash);
        if hangs {
            std::future::pending::<()>().await;
        }
        let success = !self.reverting.lock().unwrap().contains(&tx_hash);
        Ok(BatchReceipt {
            tx_hash,
            block_number: Some(100),
            success,
        })
    }
}

/// Data store whose writes can be switched off.
pub struct FlakyDataStore {
    inner: Arc<MemoryStreamStore>,
    failing: AtomicBool,
}

impl FlakyDataStore {
    pub fn new(inner: Arc<MemoryStreamStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for FlakyDataStore {
    async fn set(&self, entries: Vec<StoredEntry>) -> Result<B256, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Connection("data store unreachable".into()));
        }
        self.inner.set(entries).await
    }

    async fn get_all_for_publisher_and_schema(
        &self,
        schema_id: SchemaId,
        publisher: Address,
    ) -> Result<Vec<Bytes>, AppError> {
        self.inner
            .get_all_for_publisher_and_schema(schema_id, publisher)
            .await
    }
}

/// A keeper wired to fakes, with handles to inspect what it did.
pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub store: Arc<MemoryStreamStore>,
    pub data: Arc<FlakyDataStore>,
    pub audit: Arc<AuditLogPublisher>,
    pub journal: Database,
    pub stats: Arc<KeeperStats>,
    pub shutdown: CancellationToken,
}

impl Harness {
    pub async fn new(ledger: FakeLedger) -> Self {
        let store = Arc::new(MemoryStreamStore::new(keeper()));
        let data = Arc::new(FlakyDataStore::new(store.clone()));
        let audit = Arc::new(AuditLogPublisher::new(store.clone(), data.clone(), keeper()));
        audit.register_all().await.expect("register schemas");
        Self {
            ledger: Arc::new(ledger),
            store,
            data,
            audit,
            journal: Database::new("sqlite::memory:").await.expect("db"),
            stats: Arc::new(KeeperStats::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn engine(&self, max_batch_size: usize, config: KeeperConfig) -> KeeperEngine {
        KeeperEngine::new(
            self.ledger.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            optimizer(max_batch_size),
            self.audit.clone(),
            Some(self.journal.clone()),
            self.stats.clone(),
            config,
            self.shutdown.clone(),
        )
        .with_clock(fixed_clock)
    }

    pub fn log_entries(&self) -> usize {
        self.store
            .entry_count(self.audit.schema_id(AuditRecord::schema()))
    }
}
