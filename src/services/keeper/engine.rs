// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::time_utils::current_unix_millis;
use crate::domain::error::AppError;
use crate::domain::ports::{BatchSubmitter, FeeOracle, StreamSource};
use crate::domain::types::{AuditRecord, Batch, BatchReceipt, ContentId, Decision};
use crate::infrastructure::data::db::{BatchOutcome, Database};
use crate::infrastructure::data::records::SchemaRecord;
use crate::infrastructure::data::rows::BatchStatus;
use crate::services::keeper::audit::AuditLogPublisher;
use crate::services::keeper::optimizer::{BatchOptimizer, PricingInputs, work_items};
use crate::services::keeper::stats::KeeperStats;
use alloy::primitives::B256;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;

/// Where in a tick a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    StreamRead,
    FeeRead,
    Encode,
    Publish,
    Journal,
    BatchSubmit,
    BatchConfirm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abandon the tick; the next tick starts from scratch.
    AbortTick,
    /// Log and carry on with the same tick.
    LogAndContinue,
    /// Give up on the current batch only.
    IsolateAndContinue,
}

impl FailureStage {
    pub fn policy(self) -> FailurePolicy {
        match self {
            FailureStage::StreamRead | FailureStage::FeeRead => FailurePolicy::AbortTick,
            FailureStage::Encode | FailureStage::Publish | FailureStage::Journal => {
                FailurePolicy::LogAndContinue
            }
            FailureStage::BatchSubmit | FailureStage::BatchConfirm => {
                FailurePolicy::IsolateAndContinue
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::StreamRead => "stream_read",
            FailureStage::FeeRead => "fee_read",
            FailureStage::Encode => "encode",
            FailureStage::Publish => "publish",
            FailureStage::Journal => "journal",
            FailureStage::BatchSubmit => "batch_submit",
            FailureStage::BatchConfirm => "batch_confirm",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    NoStreams,
    Aborted {
        stage: FailureStage,
        error: String,
    },
    Skipped {
        reason: String,
        published: bool,
    },
    /// Dry run: batches were decided but not submitted.
    Planned {
        batches: usize,
        published: bool,
    },
    Executed {
        batches: usize,
        confirmed: usize,
        failed: usize,
        /// Batches left unattempted because shutdown was requested.
        cancelled: usize,
        published: bool,
    },
}

#[derive(Clone, Debug)]
pub struct KeeperConfig {
    pub poll_interval: Duration,
    pub pricing: PricingInputs,
    pub confirmation_timeout: Duration,
    pub dry_run: bool,
}

/// The keeper's periodic decide, record, execute cycle.
pub struct KeeperEngine {
    streams: Arc<dyn StreamSource>,
    fees: Arc<dyn FeeOracle>,
    submitter: Arc<dyn BatchSubmitter>,
    optimizer: BatchOptimizer,
    audit: Arc<AuditLogPublisher>,
    journal: Option<Database>,
    stats: Arc<KeeperStats>,
    config: KeeperConfig,
    shutdown: CancellationToken,
    clock: fn() -> u64,
}

impl KeeperEngine {
    pub fn new(
        streams: Arc<dyn StreamSource>,
        fees: Arc<dyn FeeOracle>,
        submitter: Arc<dyn BatchSubmitter>,
        optimizer: BatchOptimizer,
        audit: Arc<AuditLogPublisher>,
        journal: Option<Database>,
        stats: Arc<KeeperStats>,
        config: KeeperConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            streams,
            fees,
            submitter,
            optimizer,
            audit,
            journal,
            stats,
            config,
            shutdown,
            clock: current_unix_millis,
        }
    }

    /// Replaces the millisecond clock used to stamp decisions.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn stats(&self) -> Arc<KeeperStats> {
        self.stats.clone()
    }

    /// Runs ticks until shutdown. Ticks run inline, so a slow tick delays the
    /// next one and missed firings are dropped rather than queued.
    pub async fn run(&self) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            target: "keeper",
            poll_secs = self.config.poll_interval.as_secs_f64(),
            dry_run = self.config.dry_run,
            "Keeper loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let outcome = self.run_tick().await;
                    tracing::debug!(target: "keeper", ?outcome, "Tick finished");
                    self.note_overrun(started.elapsed());
                }
            }
        }
        tracing::info!(target: "shutdown", "Keeper loop stopped");
    }

    fn note_overrun(&self, elapsed: Duration) {
        let poll = self.config.poll_interval.as_millis().max(1);
        let missed = (elapsed.as_millis() / poll) as u64;
        if missed > 0 {
            self.stats.ticks_overrun.fetch_add(missed, std::sync::atomic::Ordering::Relaxed);
            tracing::warn!(
                target: "keeper",
                elapsed_ms = elapsed.as_millis() as u64,
                missed,
                "Tick overran the poll interval; skipped firings"
            );
        }
    }

    pub async fn run_tick(&self) -> TickOutcome {
        KeeperStats::bump(&self.stats.ticks);

        let ids = match self.streams.active_stream_ids().await {
            Ok(ids) => ids,
            Err(err) => return self.abort(FailureStage::StreamRead, err),
        };
        if ids.is_empty() {
            KeeperStats::bump(&self.stats.ticks_empty);
            tracing::info!(target: "keeper", "No streams to update");
            return TickOutcome::NoStreams;
        }
        tracing::info!(target: "keeper", streams = ids.len(), "Analyzing streams");

        let fee_price = match self.fees.fee_price().await {
            Ok(fee) => fee,
            Err(err) => return self.abort(FailureStage::FeeRead, err),
        };

        let items = work_items(&ids, self.config.pricing.reward_rate_per_item);
        let result = self.optimizer.optimize(&items, fee_price, self.config.pricing);
        let record = AuditRecord::from_result((self.clock)(), fee_price, &result);

        match record.decision {
            Decision::Skip => {
                KeeperStats::bump(&self.stats.decisions_skip);
                tracing::info!(target: "keeper", fee_price, reason = %record.reason, "Not profitable");
            }
            Decision::Execute => {
                KeeperStats::bump(&self.stats.decisions_execute);
                tracing::info!(
                    target: "keeper",
                    fee_price,
                    batches = result.batches.len(),
                    expected_profit = %record.expected_profit,
                    reason = %record.reason,
                    "Profitable"
                );
            }
        }

        let (content_id, published) = self.publish_decision(&record).await;

        if !result.is_profitable {
            return TickOutcome::Skipped {
                reason: record.reason,
                published,
            };
        }
        if self.config.dry_run {
            tracing::info!(target: "keeper", batches = result.batches.len(), "Dry run; batches not submitted");
            return TickOutcome::Planned {
                batches: result.batches.len(),
                published,
            };
        }

        let mut confirmed = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        for (index, batch) in result.batches.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                cancelled = result.batches.len() - index;
                tracing::info!(target: "shutdown", remaining = cancelled, "Shutdown requested; not starting further batches");
                break;
            }
            if self.execute_batch(content_id, index, batch).await {
                confirmed += 1;
            } else {
                failed += 1;
            }
        }

        TickOutcome::Executed {
            batches: result.batches.len(),
            confirmed,
            failed,
            cancelled,
            published,
        }
    }

    fn abort(&self, stage: FailureStage, err: AppError) -> TickOutcome {
        debug_assert_eq!(stage.policy(), FailurePolicy::AbortTick);
        KeeperStats::bump(&self.stats.ticks_aborted);
        tracing::error!(target: "keeper", stage = stage.as_str(), error = %err, "Keeper cycle aborted");
        TickOutcome::Aborted {
            stage,
            error: err.to_string(),
        }
    }

    /// Best effort: failures are logged, never returned.
    async fn publish_decision(&self, record: &AuditRecord) -> (ContentId, bool) {
        let content_id = record.content_id();
        let (published, handle) = match self.audit.publish(record).await {
            Ok(receipt) => {
                tracing::info!(
                    target: "audit",
                    decision = %record.decision,
                    content_id = %content_id,
                    tx = ?receipt.write_handle,
                    "Decision published"
                );
                (true, receipt.write_handle)
            }
            Err(err @ AppError::Encoding(_)) => {
                self.note_failure(FailureStage::Encode, &err);
                (false, None)
            }
            Err(err) => {
                self.note_failure(FailureStage::Publish, &err);
                (false, None)
            }
        };

        if let Some(db) = &self.journal
            && let Err(err) = db.record_decision(content_id, record, handle).await
        {
            self.note_failure(FailureStage::Journal, &err);
        }
        (content_id, published)
    }

    fn note_failure(&self, stage: FailureStage, err: &AppError) {
        debug_assert_ne!(stage.policy(), FailurePolicy::AbortTick);
        match stage {
            FailureStage::Encode => {
                KeeperStats::bump(&self.stats.publish_failures);
                tracing::error!(target: "audit", stage = stage.as_str(), error = %err, "Decision record does not match its schema");
            }
            FailureStage::Publish => {
                KeeperStats::bump(&self.stats.publish_failures);
                tracing::warn!(target: "audit", stage = stage.as_str(), error = %err, "Failed to publish decision");
            }
            FailureStage::Journal => {
                KeeperStats::bump(&self.stats.journal_failures);
                tracing::warn!(target: "db", stage = stage.as_str(), error = %err, "Journal write failed");
            }
            _ => {
                KeeperStats::bump(&self.stats.batches_failed);
                tracing::warn!(target: "ledger", stage = stage.as_str(), error = %err, "Batch failed");
            }
        }
    }

    /// Submits one batch and waits for it. Returns whether it confirmed.
    async fn execute_batch(&self, content_id: ContentId, index: usize, batch: &Batch) -> bool {
        tracing::info!(target: "ledger", batch = index, streams = batch.count(), "Updating batch");
        let tx_hash = match self.submitter.submit_batch_update(&batch.stream_ids).await {
            Ok(hash) => hash,
            Err(err) => {
                self.note_failure(FailureStage::BatchSubmit, &err);
                self.journal_batch(content_id, index, batch, None, BatchStatus::Failed, Some(err.to_string()))
                    .await;
                return false;
            }
        };
        tracing::info!(target: "ledger", batch = index, tx = %tx_hash, "Batch submitted");

        let waited = timeout(
            self.config.confirmation_timeout,
            self.submitter.await_confirmation(tx_hash),
        )
        .await
        .unwrap_or_else(|_| {
            Err(AppError::ConfirmationTimeout {
                hash: format!("{:#x}", tx_hash),
                waited_ms: self.config.confirmation_timeout.as_millis() as u64,
            })
        });

        match waited {
            Ok(receipt) if receipt.success => {
                KeeperStats::bump(&self.stats.batches_confirmed);
                tracing::info!(target: "ledger", batch = index, tx = %tx_hash, block = ?receipt.block_number, "Batch confirmed");
                self.journal_receipt(content_id, index, batch, receipt, BatchStatus::Confirmed, None)
                    .await;
                true
            }
            Ok(receipt) => {
                let err = AppError::Transaction {
                    hash: format!("{:#x}", tx_hash),
                    reason: "reverted".into(),
                };
                self.note_failure(FailureStage::BatchConfirm, &err);
                self.journal_receipt(content_id, index, batch, receipt, BatchStatus::Reverted, Some(err.to_string()))
                    .await;
                false
            }
            Err(err) => {
                let status = match err {
                    AppError::ConfirmationTimeout { .. } => BatchStatus::TimedOut,
                    _ => BatchStatus::Failed,
                };
                self.note_failure(FailureStage::BatchConfirm, &err);
                self.journal_batch(content_id, index, batch, Some(tx_hash), status, Some(err.to_string()))
                    .await;
                false
            }
        }
    }

    async fn journal_receipt(
        &self,
        content_id: ContentId,
        index: usize,
        batch: &Batch,
        receipt: BatchReceipt,
        status: BatchStatus,
        error: Option<String>,
    ) {
        self.write_batch(BatchOutcome {
            content_id,
            batch_index: index,
            stream_ids: &batch.stream_ids,
            tx_hash: Some(receipt.tx_hash),
            block_number: receipt.block_number,
            status,
            error,
        })
        .await;
    }

    async fn journal_batch(
        &self,
        content_id: ContentId,
        index: usize,
        batch: &Batch,
        tx_hash: Option<B256>,
        status: BatchStatus,
        error: Option<String>,
    ) {
        self.write_batch(BatchOutcome {
            content_id,
            batch_index: index,
            stream_ids: &batch.stream_ids,
            tx_hash,
            block_number: None,
            status,
            error,
        })
        .await;
    }

    async fn write_batch(&self, outcome: BatchOutcome<'_>) {
        if let Some(db) = &self.journal
            && let Err(err) = db.record_batch(&outcome).await
        {
            self.note_failure(FailureStage::Journal, &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_matches_failure_taxonomy() {
        use FailurePolicy::*;
        use FailureStage::*;
        let table = [
            (StreamRead, AbortTick),
            (FeeRead, AbortTick),
            (Encode, LogAndContinue),
            (Publish, LogAndContinue),
            (Journal, LogAndContinue),
            (BatchSubmit, IsolateAndContinue),
            (BatchConfirm, IsolateAndContinue),
        ];
        for (stage, policy) in table {
            assert_eq!(stage.policy(), policy, "{}", stage.as_str());
        }
    }
}
