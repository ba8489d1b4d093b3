// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Transaction failed: {hash:?}, reason: {reason}")]
    Transaction { hash: String, reason: String },

    #[error("Confirmation for {hash} not observed within {waited_ms}ms")]
    ConfirmationTimeout { hash: String, waited_ms: u64 },

    /// Record and schema disagree on arity or field types. A programming error.
    #[error("Encoding invariant violated: {0}")]
    Encoding(String),

    #[error("Malformed stored entry: {0}")]
    Decode(String),

    #[error("Audit publish failed: {0}")]
    Publish(String),

    #[error("Journal storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
