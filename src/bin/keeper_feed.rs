// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::primitives::Address;
use clap::Parser;
use lucid_keeper::app::config::KeeperSettings;
use lucid_keeper::app::logging::setup_logging;
use lucid_keeper::app::shutdown::cancel_on_stop_signal;
use lucid_keeper::domain::error::AppError;
use lucid_keeper::infrastructure::data::streams::StreamsClient;
use lucid_keeper::infrastructure::network::provider::ConnectionFactory;
use lucid_keeper::services::keeper::{AuditLogPublisher, FeedSnapshot, LiveFeed};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Follow a keeper's published decisions")]
struct Cli {
    /// Path to config file (default: config.toml if present)
    #[arg(long)]
    config: Option<String>,

    /// Keeper address to follow (overrides KEEPER_ADDRESS)
    #[arg(long)]
    keeper: Option<Address>,

    /// Print one snapshot and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = KeeperSettings::read_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), settings.log_json)?;

    let streams = settings
        .streams_address
        .ok_or_else(|| AppError::Config("STREAMS_ADDRESS is missing".to_string()))?;
    let provider = ConnectionFactory::http(&settings.rpc_url_value())?;
    let client = Arc::new(StreamsClient::new(
        streams,
        provider,
        None,
        settings.retry_policy(),
    ));
    let keeper = cli.keeper.or(settings.keeper_address);
    let audit = Arc::new(AuditLogPublisher::new(
        client.clone(),
        client,
        keeper.unwrap_or_default(),
    ));
    let feed = Arc::new(LiveFeed::new(
        audit,
        keeper,
        settings.feed_limit_value(),
        settings.feed_poll(),
    ));

    if cli.once {
        print_snapshot(&feed.refresh().await)?;
        return Ok(());
    }

    let shutdown = cancel_on_stop_signal();
    let mut updates = feed.subscribe();
    let runner = {
        let feed = feed.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { feed.run(shutdown).await })
    };
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot)?;
            }
        }
    }
    runner
        .await
        .map_err(|e| AppError::Unknown(anyhow::anyhow!("feed task failed: {e}")))?;
    Ok(())
}

fn print_snapshot(snapshot: &FeedSnapshot) -> Result<(), AppError> {
    let line = serde_json::to_string(snapshot)
        .map_err(|e| AppError::Unknown(anyhow::anyhow!("serialize feed snapshot: {e}")))?;
    println!("{line}");
    Ok(())
}
