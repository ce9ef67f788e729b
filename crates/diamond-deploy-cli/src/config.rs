// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Common configuration options for commands in the diamond-deploy CLI.

use std::{num::ParseIntError, path::PathBuf, sync::Arc, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clap::Args;
use diamond_deploy::{
    AlloyChainClient, ArtifactRegistry, DeployContext, ForgeVerifier, Network,
};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Common configuration options for all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalConfig {
    /// URL of the Ethereum RPC endpoint
    #[clap(short, long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<Url>,

    /// Private key of the deployer wallet
    #[clap(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<PrivateKeySigner>,

    /// Name of the target network.
    ///
    /// `hardhat` and `anvil` are treated as throwaway chains and keep no ledger. `localhost` keeps
    /// a ledger but skips source verification. Any other name is treated as a live network.
    #[clap(long, env = "NETWORK", global = true, default_value = "localhost")]
    pub network: String,

    /// Directory holding the deployment ledgers
    #[clap(long, env = "DEPLOYMENT_DIR", global = true, default_value = "deployment")]
    pub deployment_dir: PathBuf,

    /// Directory holding the compiled contract artifacts
    #[clap(long, env = "ARTIFACTS_DIR", global = true, default_value = "out")]
    pub artifacts_dir: PathBuf,

    /// Ethereum transaction timeout in seconds.
    #[clap(long, env = "TX_TIMEOUT", global = true, value_parser = |arg: &str| -> Result<Duration, ParseIntError> {Ok(Duration::from_secs(arg.parse()?))})]
    pub tx_timeout: Option<Duration>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long, env = "LOG_LEVEL", global = true, default_value = "info")]
    pub log_level: LevelFilter,

    /// Skip the confirmation prompt before sending transactions to a live network
    #[clap(long, short = 'y', global = true)]
    pub yes: bool,

    /// API key for source verification on Etherscan-compatible explorers
    #[clap(long, env = "ETHERSCAN_API_KEY", global = true, hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Verification endpoint, for explorers other than Etherscan
    #[clap(long, env = "VERIFIER_URL", global = true)]
    pub verifier_url: Option<Url>,
}

impl GlobalConfig {
    /// Access [Self::rpc_url] or return an error that can be shown to the user.
    pub fn require_rpc_url(&self) -> Result<Url> {
        self.rpc_url
            .clone()
            .context("Blockchain RPC URL not provided; please set --rpc-url or the RPC_URL env var")
    }

    /// Access [Self::private_key] or return an error that can be shown to the user.
    pub fn require_private_key(&self) -> Result<PrivateKeySigner> {
        self.private_key.clone().context(
            "Private key not provided; please set --private-key or the PRIVATE_KEY env var",
        )
    }

    /// Connect to the RPC endpoint and load the artifacts, producing the context shared by the
    /// deployers.
    ///
    /// Requires [Self::rpc_url] and [Self::private_key] to be set.
    pub async fn deploy_context(&self) -> Result<DeployContext> {
        let rpc_url = self.require_rpc_url()?;
        let client =
            AlloyChainClient::connect(rpc_url.clone(), self.require_private_key()?, self.tx_timeout);
        let chain_id = client
            .chain_id()
            .await
            .with_context(|| format!("failed to connect provider to {rpc_url}"))?;
        let network = Network::new(&self.network, chain_id);
        tracing::debug!("Connected to {network}");

        let registry = ArtifactRegistry::load_dir(&self.artifacts_dir)
            .context("Failed to load contract artifacts; did you compile the contracts?")?;

        let mut builder = DeployContext::builder();
        builder
            .chain(Arc::new(client))
            .registry(Arc::new(registry))
            .network(network.clone())
            .deployment_dir(self.deployment_dir.clone());
        if network.verifies_sources() {
            builder.verifier(Arc::new(
                ForgeVerifier::new(".", chain_id)
                    .with_etherscan_api_key(self.etherscan_api_key.clone())
                    .with_verifier_url(self.verifier_url.clone()),
            ));
        }
        builder.build().context("Failed to build deployment context")
    }
}
