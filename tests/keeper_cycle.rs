// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

mod support;

use alloy::primitives::{B256, U256};
use lucid_keeper::data::records::content_id;
use lucid_keeper::domain::types::{AuditRecord, Decision};
use lucid_keeper::keeper::{FailureStage, KeeperConfig, TickOutcome};
use std::time::Duration;
use support::{
    BatchScript, CHEAP_FEE, EXPENSIVE_FEE, FIXED_NOW_MS, FakeLedger, Harness, config, stream_ids,
};

fn execute_id() -> B256 {
    content_id("keeper", FIXED_NOW_MS, Decision::Execute)
}

#[tokio::test]
async fn empty_stream_set_publishes_nothing() {
    let h = Harness::new(FakeLedger::new(Vec::new(), CHEAP_FEE)).await;
    let outcome = h.engine(50, config()).run_tick().await;

    assert_eq!(outcome, TickOutcome::NoStreams);
    assert_eq!(h.log_entries(), 0);
    assert_eq!(h.ledger.submit_calls(), 0);
    assert_eq!(h.stats.snapshot().ticks_empty, 1);
}

#[tokio::test]
async fn expensive_fee_records_a_skip_and_submits_nothing() {
    let h = Harness::new(FakeLedger::new(stream_ids(5), EXPENSIVE_FEE)).await;
    let outcome = h.engine(50, config()).run_tick().await;

    match outcome {
        TickOutcome::Skipped { reason, published } => {
            assert!(published);
            assert!(reason.contains("exceeds reward"), "{reason}");
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(h.ledger.submit_calls(), 0);

    let logged: Vec<AuditRecord> = h.audit.list_recent(support::keeper(), 10).await.unwrap().collect();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].decision, Decision::Skip);
    assert_eq!(logged[0].expected_profit, "0");
    assert_eq!(logged[0].batch_size, 0);
    assert_eq!(logged[0].fee_price, U256::from(EXPENSIVE_FEE));
}

#[tokio::test]
async fn profitable_tick_settles_every_batch_in_order() {
    let h = Harness::new(FakeLedger::new(stream_ids(5), CHEAP_FEE)).await;
    let outcome = h.engine(2, config()).run_tick().await;

    assert_eq!(
        outcome,
        TickOutcome::Executed {
            batches: 3,
            confirmed: 3,
            failed: 0,
            cancelled: 0,
            published: true,
        }
    );
    let submitted = h.ledger.submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(submitted.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    let mut settled: Vec<_> = submitted.concat();
    settled.sort();
    assert_eq!(settled, stream_ids(5));

    let logged: Vec<AuditRecord> = h.audit.list_recent(support::keeper(), 10).await.unwrap().collect();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].decision, Decision::Execute);
    assert_eq!(logged[0].batch_size, 3);

    let rows = h.journal.batches_for(execute_id()).await.unwrap();
    assert_eq!(
        rows.iter().map(|r| r.status.as_str()).collect::<Vec<_>>(),
        vec!["confirmed"; 3]
    );
    let decisions = h.journal.recent_decisions(10).await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].publish_tx.is_some());
}

#[tokio::test]
async fn nine_tiered_streams_at_low_fee_execute_high_tier_first() {
    let h = Harness::new(FakeLedger::new(stream_ids(9), CHEAP_FEE)).await;
    let outcome = h.engine(4, config()).run_tick().await;

    assert!(matches!(
        outcome,
        TickOutcome::Executed {
            batches: 3,
            confirmed: 3,
            ..
        }
    ));
    // Positions rotate high, medium, low; equal rewards fall back to id order.
    let submitted = h.ledger.submitted();
    assert_eq!(submitted[0], vec![1u64, 4, 7, 2].into_iter().map(U256::from).collect::<Vec<_>>());
    assert!(submitted.iter().map(Vec::len).sum::<usize>() <= 9);

    let logged: Vec<AuditRecord> = h.audit.list_recent(support::keeper(), 1).await.unwrap().collect();
    assert_eq!(logged[0].decision, Decision::Execute);
    assert_eq!(logged[0].batch_size as usize, submitted.len());
}

#[tokio::test]
async fn read_failures_abort_the_tick_before_anything_is_written() {
    let h = Harness::new(FakeLedger::new(stream_ids(3), CHEAP_FEE)).await;
    let engine = h.engine(50, config());

    h.ledger.fail_streams("rpc down");
    match engine.run_tick().await {
        TickOutcome::Aborted { stage, error } => {
            assert_eq!(stage, FailureStage::StreamRead);
            assert!(error.contains("rpc down"));
        }
        other => panic!("expected abort, got {other:?}"),
    }

    let h = Harness::new(FakeLedger::new(stream_ids(3), CHEAP_FEE)).await;
    let engine = h.engine(50, config());
    h.ledger.fail_fee("gas price unavailable");
    assert!(matches!(
        engine.run_tick().await,
        TickOutcome::Aborted {
            stage: FailureStage::FeeRead,
            ..
        }
    ));
    assert_eq!(h.log_entries(), 0);
    assert_eq!(h.ledger.submit_calls(), 0);
    assert!(h.journal.recent_decisions(10).await.unwrap().is_empty());
    assert_eq!(h.stats.snapshot().ticks_aborted, 1);
}

#[tokio::test]
async fn a_failed_tick_does_not_poison_the_next_one() {
    let h = Harness::new(FakeLedger::new(stream_ids(2), CHEAP_FEE)).await;
    let engine = h.engine(50, config());

    h.ledger.fail_fee("timeout");
    assert!(matches!(engine.run_tick().await, TickOutcome::Aborted { .. }));
    h.ledger.set_fee(CHEAP_FEE);
    assert!(matches!(
        engine.run_tick().await,
        TickOutcome::Executed { confirmed: 1, .. }
    ));
}

#[tokio::test]
async fn publish_failure_does_not_block_execution() {
    let h = Harness::new(FakeLedger::new(stream_ids(4), CHEAP_FEE)).await;
    h.data.set_failing(true);
    let outcome = h.engine(50, config()).run_tick().await;

    assert_eq!(
        outcome,
        TickOutcome::Executed {
            batches: 1,
            confirmed: 1,
            failed: 0,
            cancelled: 0,
            published: false,
        }
    );
    assert_eq!(h.log_entries(), 0);
    assert_eq!(h.stats.snapshot().publish_failures, 1);

    // The journal still has the decision, without a publish handle.
    let decisions = h.journal.recent_decisions(10).await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert!(decisions[0].publish_tx.is_none());
}

#[tokio::test]
async fn batch_failures_are_isolated() {
    let h = Harness::new(FakeLedger::new(stream_ids(4), CHEAP_FEE)).await;
    h.ledger.script(vec![
        BatchScript::RejectSubmit,
        BatchScript::Revert,
        BatchScript::Confirm,
        BatchScript::Hang,
    ]);
    let outcome = h
        .engine(
            1,
            KeeperConfig {
                confirmation_timeout: Duration::from_millis(100),
                ..config()
            },
        )
        .run_tick()
        .await;

    assert_eq!(
        outcome,
        TickOutcome::Executed {
            batches: 4,
            confirmed: 1,
            failed: 3,
            cancelled: 0,
            published: true,
        }
    );
    assert_eq!(h.ledger.submit_calls(), 4);

    let rows = h.journal.batches_for(execute_id()).await.unwrap();
    assert_eq!(
        rows.iter().map(|r| r.status.as_str()).collect::<Vec<_>>(),
        vec!["failed", "reverted", "confirmed", "timed_out"]
    );
    assert!(rows[0].tx_hash.is_none());
    assert!(rows[0].error.as_deref().unwrap_or_default().contains("nonce too low"));
    assert!(rows[3].tx_hash.is_some());

    let stats = h.stats.snapshot();
    assert_eq!(stats.batches_confirmed, 1);
    assert_eq!(stats.batches_failed, 3);
}

#[tokio::test]
async fn dry_run_decides_and_publishes_without_submitting() {
    let h = Harness::new(FakeLedger::new(stream_ids(3), CHEAP_FEE)).await;
    let outcome = h
        .engine(
            2,
            KeeperConfig {
                dry_run: true,
                ..config()
            },
        )
        .run_tick()
        .await;

    assert_eq!(
        outcome,
        TickOutcome::Planned {
            batches: 2,
            published: true,
        }
    );
    assert_eq!(h.ledger.submit_calls(), 0);
    assert_eq!(h.log_entries(), 1);
}

#[tokio::test]
async fn shutdown_lets_the_current_batch_finish_and_starts_no_more() {
    let h = Harness::new(FakeLedger::new(stream_ids(3), CHEAP_FEE)).await;
    h.ledger.cancel_after_first_submit(h.shutdown.clone());
    let outcome = h.engine(1, config()).run_tick().await;

    assert_eq!(
        outcome,
        TickOutcome::Executed {
            batches: 3,
            confirmed: 1,
            failed: 0,
            cancelled: 2,
            published: true,
        }
    );
    assert_eq!(h.ledger.submit_calls(), 1);
}

#[tokio::test]
async fn same_decision_in_the_same_millisecond_is_one_entry() {
    let h = Harness::new(FakeLedger::new(stream_ids(2), EXPENSIVE_FEE)).await;
    let engine = h.engine(50, config());
    engine.run_tick().await;
    engine.run_tick().await;

    assert_eq!(h.log_entries(), 1);
    assert_eq!(h.journal.recent_decisions(10).await.unwrap().len(), 1);
    assert_eq!(h.stats.snapshot().decisions_skip, 2);
}

#[tokio::test]
async fn run_loop_ticks_until_cancelled() {
    let h = Harness::new(FakeLedger::new(Vec::new(), CHEAP_FEE)).await;
    let engine = h.engine(50, config());
    let shutdown = h.shutdown.clone();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.cancel();
    });
    tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .expect("loop stops on cancellation");
    stopper.await.unwrap();

    let stats = h.stats.snapshot();
    assert!(stats.ticks >= 2, "ticks = {}", stats.ticks);
    assert_eq!(stats.ticks, stats.ticks_empty);
}

#[tokio::test]
async fn slow_ticks_never_overlap() {
    let h = Harness::new(FakeLedger::new(stream_ids(1), CHEAP_FEE)).await;
    h.ledger.slow_confirmations(Duration::from_millis(70));
    let engine = h.engine(50, config());
    let shutdown = h.shutdown.clone();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
    });
    tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .expect("loop stops on cancellation");
    stopper.await.unwrap();

    assert_eq!(h.ledger.max_concurrent_confirmations(), 1);
    let stats = h.stats.snapshot();
    assert!(stats.ticks >= 2);
    assert!(stats.ticks_overrun >= 1, "overruns = {}", stats.ticks_overrun);
    assert!(h.ledger.submit_calls() as u64 <= stats.ticks);
}
