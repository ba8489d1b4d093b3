// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod audit;
pub mod engine;
pub mod feed;
pub mod optimizer;
pub mod stats;

pub use audit::{AuditLogPublisher, PublishReceipt};
pub use engine::{FailurePolicy, FailureStage, KeeperConfig, KeeperEngine, TickOutcome};
pub use feed::{FeedEntry, FeedSnapshot, LiveFeed};
pub use optimizer::{BatchOptimizer, OptimizerParams, PricingInputs};
pub use stats::KeeperStats;
