// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use lucid_keeper::app::config::KeeperSettings;
use lucid_keeper::app::logging::setup_logging;
use lucid_keeper::domain::error::AppError;
use lucid_keeper::domain::types::{AuditRecord, StreamUpdateRecord};
use lucid_keeper::infrastructure::data::records::SchemaRecord;
use lucid_keeper::infrastructure::data::streams::StreamsClient;
use lucid_keeper::infrastructure::network::nonce::NonceManager;
use lucid_keeper::infrastructure::network::provider::ConnectionFactory;
use lucid_keeper::services::keeper::AuditLogPublisher;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Register the keeper's record schemas")]
struct Cli {
    /// Path to config file (default: config.toml if present)
    #[arg(long)]
    config: Option<String>,

    /// Print schema ids (checked against the store) without registering anything
    #[arg(long, default_value_t = false)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = KeeperSettings::read_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), settings.log_json)?;

    let streams = settings
        .streams_address
        .ok_or_else(|| AppError::Config("STREAMS_ADDRESS is missing".to_string()))?;
    let rpc_url = settings.rpc_url_value();

    let (provider, signer, lane) = if cli.check {
        (ConnectionFactory::http(&rpc_url)?, settings.keeper_address, None)
    } else {
        let (provider, address) =
            ConnectionFactory::with_signer(&rpc_url, &settings.keeper_private_key)?;
        let retry = settings.retry_policy();
        let lane = Arc::new(NonceManager::new(provider.clone(), address, retry));
        (provider, Some(address), Some(lane))
    };
    let client = Arc::new(StreamsClient::new(
        streams,
        provider,
        lane,
        settings.retry_policy(),
    ));
    let audit = AuditLogPublisher::new(
        client.clone(),
        client,
        signer.unwrap_or_default(),
    );

    for schema in [AuditRecord::schema(), StreamUpdateRecord::schema()] {
        let id = audit.verify_schema_id(schema).await?;
        println!("{}\t{:#x}\t{}", schema.name(), id, schema.canonical());
        if !cli.check {
            audit.register_schema(schema).await?;
        }
    }
    Ok(())
}
