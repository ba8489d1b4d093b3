// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use url::Url;

pub type HttpProvider = DynProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    /// Read-only provider; does not touch the network until first use.
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url = parse_url(rpc_url)?;
        Ok(RootProvider::<Ethereum>::new_http(url).erased())
    }

    /// Provider that signs with the keeper key. Returns the signer's address.
    pub fn with_signer(
        rpc_url: &str,
        private_key: &str,
    ) -> Result<(HttpProvider, Address), AppError> {
        let url = parse_url(rpc_url)?;
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| AppError::Config(format!("Invalid keeper private key: {}", e)))?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(url)
            .erased();
        Ok((provider, address))
    }
}

fn parse_url(rpc_url: &str) -> Result<Url, AppError> {
    Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))
}
