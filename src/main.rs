// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use lucid_keeper::app::config::KeeperSettings;
use lucid_keeper::app::logging::setup_logging;
use lucid_keeper::app::shutdown::cancel_on_stop_signal;
use lucid_keeper::common::metrics::spawn_metrics_server;
use lucid_keeper::domain::error::AppError;
use lucid_keeper::domain::ports::{DataStore, SchemaStore};
use lucid_keeper::infrastructure::data::db::Database;
use lucid_keeper::infrastructure::data::memory::MemoryStreamStore;
use lucid_keeper::infrastructure::data::streams::StreamsClient;
use lucid_keeper::infrastructure::network::gas::GasOracle;
use lucid_keeper::infrastructure::network::ledger::{LedgerClient, ReceiptWait};
use lucid_keeper::infrastructure::network::nonce::NonceManager;
use lucid_keeper::infrastructure::network::provider::ConnectionFactory;
use lucid_keeper::services::keeper::{
    AuditLogPublisher, BatchOptimizer, KeeperConfig, KeeperEngine, KeeperStats,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Payment-stream keeper")]
struct Cli {
    /// Path to config file (default: config.toml if present)
    #[arg(long)]
    config: Option<String>,

    /// Decide and publish to an in-process log, never submit batches
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Metrics port (overrides config/env; 0 disables)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let settings = KeeperSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), settings.log_json)?;

    let rpc_url = settings.rpc_url_value();
    let lucidpay = settings.lucidpay_address()?;
    let (provider, keeper_address) =
        ConnectionFactory::with_signer(&rpc_url, &settings.keeper_private_key)?;
    if let Some(configured) = settings.keeper_address
        && configured != keeper_address
    {
        return Err(AppError::Config(format!(
            "keeper_address {} does not match keeper_private_key address {}",
            configured, keeper_address
        )));
    }
    tracing::info!(
        target: "config",
        keeper = %keeper_address,
        rpc = %rpc_url,
        contract = %lucidpay,
        dry_run = cli.dry_run,
        "Keeper starting"
    );

    let retry = settings.retry_policy();
    let lane = Arc::new(NonceManager::new(provider.clone(), keeper_address, retry));
    let ledger = Arc::new(LedgerClient::new(
        lucidpay,
        provider.clone(),
        Some(lane.clone()),
        retry,
        ReceiptWait {
            poll: settings.receipt_poll(),
            timeout: settings.receipt_timeout(),
        },
    ));
    let gas_oracle = Arc::new(GasOracle::new(provider.clone(), retry));

    let (schema_store, data_store): (Arc<dyn SchemaStore>, Arc<dyn DataStore>) =
        match settings.streams_address {
            Some(streams) if !cli.dry_run => {
                let client = Arc::new(StreamsClient::new(
                    streams,
                    provider.clone(),
                    Some(lane.clone()),
                    retry,
                ));
                let schemas: Arc<dyn SchemaStore> = client.clone();
                let data: Arc<dyn DataStore> = client;
                (schemas, data)
            }
            configured => {
                if configured.is_none() {
                    tracing::warn!(
                        target: "audit",
                        "STREAMS_ADDRESS not set; decisions are recorded in-process only"
                    );
                }
                let store = Arc::new(MemoryStreamStore::new(keeper_address));
                let schemas: Arc<dyn SchemaStore> = store.clone();
                let data: Arc<dyn DataStore> = store;
                (schemas, data)
            }
        };
    let audit = Arc::new(AuditLogPublisher::new(
        schema_store,
        data_store,
        keeper_address,
    ));
    if let Err(e) = audit.register_all().await {
        tracing::warn!(target: "audit", error = %e, "Schema registration failed; publishing may fail");
    }

    let journal = match settings.journal_url() {
        Some(url) => match Database::new(url).await {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!(target: "db", error = %e, "Journal unavailable; continuing without it");
                None
            }
        },
        None => None,
    };

    let shutdown = cancel_on_stop_signal();
    let stats = Arc::new(KeeperStats::default());
    let metrics_port = cli.metrics_port.unwrap_or(settings.metrics_port);
    if metrics_port != 0 {
        spawn_metrics_server(metrics_port, stats.clone(), shutdown.clone()).await;
    }

    let engine = KeeperEngine::new(
        ledger.clone(),
        gas_oracle,
        ledger,
        BatchOptimizer::new(settings.optimizer_params()),
        audit,
        journal,
        stats.clone(),
        KeeperConfig {
            poll_interval: settings.poll_interval(),
            pricing: settings.pricing(),
            confirmation_timeout: settings.receipt_timeout(),
            dry_run: cli.dry_run,
        },
        shutdown,
    );
    engine.run().await;

    let totals = stats.snapshot();
    tracing::info!(
        target: "shutdown",
        ticks = totals.ticks,
        executed = totals.decisions_execute,
        skipped = totals.decisions_skip,
        batches_confirmed = totals.batches_confirmed,
        batches_failed = totals.batches_failed,
        "Keeper stopped"
    );
    Ok(())
}
