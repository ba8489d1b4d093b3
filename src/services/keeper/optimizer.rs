// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Profitability and batching decision.
//!
//! Everything here is a pure function of its inputs. The audit trail depends on
//! that: replaying a published decision with the same inputs must reproduce it.
//!
//! Cost model, all amounts in the common value unit (reference price A/B are
//! the unit prices of the reward asset and the fee asset):
//!
//! ```text
//! item value  = reward_rate * price_a
//! batch gas   = base_gas + k * item_gas
//! batch cost  = batch gas * fee_price / 1e18 * price_b
//! batch net   = sum(item value) - batch cost
//! ```
//!
//! Items whose value does not cover their own marginal gas are dropped, the
//! rest are ordered by tier and value and chunked into size-capped bins. A bin
//! is kept when its net is positive and clears the configured margin.

use crate::domain::constants::{
    BATCH_CALL_OVERHEAD_GAS, BATCH_ITEM_GAS, DEFAULT_MAX_BATCH_SIZE, TX_BASE_GAS, WEI_PER_GWEI,
    WEI_PER_NATIVE,
};
use crate::domain::types::{Batch, OptimizationResult, WorkItem};
use alloy::primitives::U256;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizerParams {
    pub max_batch_size: usize,
    /// Fixed gas per batch transaction.
    pub batch_base_gas: u64,
    /// Marginal gas per stream settled inside a batch.
    pub batch_item_gas: u64,
    /// Required net margin over cost, in basis points.
    pub min_margin_bps: u32,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            batch_base_gas: TX_BASE_GAS + BATCH_CALL_OVERHEAD_GAS,
            batch_item_gas: BATCH_ITEM_GAS,
            min_margin_bps: 0,
        }
    }
}

/// Reward and reference price inputs, fixed per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingInputs {
    pub reward_rate_per_item: f64,
    pub reference_price_a: f64,
    pub reference_price_b: f64,
}

#[derive(Clone, Debug)]
pub struct BatchOptimizer {
    params: OptimizerParams,
}

struct Valued<'a> {
    item: &'a WorkItem,
    value: f64,
}

impl BatchOptimizer {
    pub fn new(params: OptimizerParams) -> Self {
        Self {
            params: OptimizerParams {
                max_batch_size: params.max_batch_size.max(1),
                ..params
            },
        }
    }

    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    pub fn optimize(
        &self,
        items: &[WorkItem],
        fee_price: u128,
        pricing: PricingInputs,
    ) -> OptimizationResult {
        if items.is_empty() {
            return OptimizationResult::not_profitable("no pending work", 0.0);
        }
        let PricingInputs {
            reward_rate_per_item,
            reference_price_a,
            reference_price_b,
        } = pricing;
        if !is_positive(reference_price_a) || !is_positive(reference_price_b) {
            return OptimizationResult::not_profitable(
                format!(
                    "invalid reference prices (a={reference_price_a}, b={reference_price_b})"
                ),
                0.0,
            );
        }

        let fee = fee_price as f64;
        let gas_cost = |gas: u64| gas as f64 * fee / WEI_PER_NATIVE * reference_price_b;
        let item_cost = gas_cost(self.params.batch_item_gas);
        let batch_cost = |k: usize| {
            gas_cost(
                self.params
                    .batch_base_gas
                    .saturating_add(self.params.batch_item_gas.saturating_mul(k as u64)),
            )
        };

        let mut seen = HashSet::with_capacity(items.len());
        let mut candidates: Vec<Valued<'_>> = items
            .iter()
            .filter(|item| seen.insert(item.id))
            .map(|item| {
                let reward = if is_positive(item.reward_rate) {
                    item.reward_rate
                } else {
                    reward_rate_per_item
                };
                Valued {
                    item,
                    value: if is_positive(reward) {
                        reward * reference_price_a
                    } else {
                        0.0
                    },
                }
            })
            .collect();
        candidates.sort_by(rank);

        // Net of settling everything naively, for the SKIP rationale.
        let naive_net = net_of_chunks(&candidates, self.params.max_batch_size, &batch_cost);

        let considered = candidates.len();
        candidates.retain(|c| c.value > item_cost);
        let dropped = considered - candidates.len();
        let gwei = fee / WEI_PER_GWEI;

        if candidates.is_empty() {
            return OptimizationResult::not_profitable(
                format!(
                    "fee {gwei:.3} gwei: per-item gas cost {item_cost:.6} exceeds reward for all {considered} streams"
                ),
                naive_net,
            );
        }

        let mut batches = Vec::new();
        let mut total_profit = 0.0;
        let mut total_cost = 0.0;
        let mut rejected = 0usize;
        let mut pool: Vec<&Valued<'_>> = Vec::new();
        let mut accept = |chunk: &[&Valued<'_>]| -> bool {
            let cost = batch_cost(chunk.len());
            let net = chunk.iter().map(|c| c.value).sum::<f64>() - cost;
            let margin = cost * f64::from(self.params.min_margin_bps) / 10_000.0;
            if net > 0.0 && net >= margin {
                total_profit += net;
                total_cost += cost;
                batches.push(Batch::new(chunk.iter().map(|c| c.item.id).collect()));
                true
            } else {
                false
            }
        };

        let ordered: Vec<&Valued<'_>> = candidates.iter().collect();
        for chunk in ordered.chunks(self.params.max_batch_size) {
            if !accept(chunk) {
                pool.extend_from_slice(chunk);
            }
        }

        // Rejected tier bins are regrouped by surplus over their own gas. The
        // top bin of that order is the best any bin of this pool can do.
        if !pool.is_empty() {
            pool.sort_by(|a, b| {
                (b.value - item_cost)
                    .total_cmp(&(a.value - item_cost))
                    .then_with(|| a.item.id.cmp(&b.item.id))
            });
            for chunk in pool.chunks(self.params.max_batch_size) {
                if !accept(chunk) {
                    rejected += 1;
                }
            }
        }

        if batches.is_empty() {
            return OptimizationResult::not_profitable(
                format!(
                    "fee {gwei:.3} gwei: no batch of up to {} streams clears its cost (naive net {naive_net:.6})",
                    self.params.max_batch_size
                ),
                naive_net,
            );
        }

        let settled: usize = batches.iter().map(Batch::count).sum();
        let mut decision = format!(
            "{settled} streams in {} batch(es) at {gwei:.3} gwei; net {total_profit:.6} after {total_cost:.6} fees",
            batches.len()
        );
        if dropped > 0 || rejected > 0 {
            decision.push_str(&format!(
                "; deferred {dropped} unprofitable streams, {rejected} batches"
            ));
        }

        OptimizationResult {
            is_profitable: true,
            decision,
            total_profit,
            batches,
        }
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Tier first, then value, flow rate and id for a total order.
fn rank(a: &Valued<'_>, b: &Valued<'_>) -> Ordering {
    a.item
        .priority
        .cmp(&b.item.priority)
        .then_with(|| b.value.total_cmp(&a.value))
        .then_with(|| b.item.flow_rate.cmp(&a.item.flow_rate))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

fn net_of_chunks(candidates: &[Valued<'_>], size: usize, batch_cost: &dyn Fn(usize) -> f64) -> f64 {
    candidates
        .chunks(size)
        .map(|chunk| chunk.iter().map(|c| c.value).sum::<f64>() - batch_cost(chunk.len()))
        .sum()
}

/// Work items for an active set, in the tier rotation the keeper uses.
pub fn work_items(ids: &[U256], reward_rate: f64) -> Vec<WorkItem> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| WorkItem {
            id: *id,
            priority: crate::domain::types::PriorityTier::for_position(i),
            reward_rate,
            flow_rate: U256::ZERO,
        })
        .collect()
}
