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

//! Deployment and upgrade of contracts behind ERC-1967 proxies.

use std::collections::BTreeMap;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, TxHash},
};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::{
    chain::deploy_contract,
    config::ConfigStore,
    context::DeployContext,
    contracts::{upgrade_to_and_call_calldata, ERC1967_IMPLEMENTATION_SLOT, ERC1967_PROXY_CONTRACT},
    network::LedgerKind,
    registry::ContractArtifact,
    verify::{verify_all, VerificationOutcome, VerificationTarget},
    DeployError,
};

/// Default name of the function called on a freshly deployed proxy.
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// Ledger of proxied and plain contracts deployed to one network.
///
/// Serialized as `{"contracts": {name: address}, "v1": {name: implementation}, "v2": ...}`,
/// where `vN` holds the implementation address of the N-th version of each proxied contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OzLedger {
    #[serde(default)]
    pub contracts: BTreeMap<String, Address>,
    #[serde(flatten)]
    versions: BTreeMap<String, BTreeMap<String, Address>>,
}

impl OzLedger {
    pub fn contract(&self, name: &str) -> Option<Address> {
        self.contracts.get(name).copied()
    }

    /// Versions recorded for `name`, in ascending order.
    pub fn versions_of(&self, name: &str) -> Vec<u32> {
        let mut versions: Vec<u32> = self
            .versions
            .iter()
            .filter(|(_, contracts)| contracts.contains_key(name))
            .filter_map(|(key, _)| key.strip_prefix('v')?.parse().ok())
            .collect();
        versions.sort_unstable();
        versions
    }

    /// Latest recorded implementation of `name`.
    pub fn implementation(&self, name: &str) -> Option<(u32, Address)> {
        let version = *self.versions_of(name).last()?;
        let address = self.versions.get(&format!("v{version}"))?.get(name).copied()?;
        Some((version, address))
    }

    /// Record `implementation` as the next version of `name` and return that version.
    pub fn record_implementation(&mut self, name: &str, implementation: Address) -> u32 {
        let version = self.versions_of(name).last().map_or(1, |latest| latest + 1);
        self.versions
            .entry(format!("v{version}"))
            .or_default()
            .insert(name.to_string(), implementation);
        version
    }
}

/// Function called on the proxy together with an upgrade.
#[derive(Clone, Debug)]
pub struct UpgradeCall {
    pub function: String,
    pub args: Vec<DynSolValue>,
}

/// Result of [ProxyDeployer::deploy].
#[derive(Debug)]
pub struct ProxyDeployment {
    /// Proxy address, or the contract itself for contracts that are not upgradeable.
    pub address: Address,
    /// Implementation behind the proxy. `None` for contracts that are not upgradeable.
    pub implementation: Option<Address>,
    /// Version the implementation was recorded under, on networks that keep a ledger.
    pub version: Option<u32>,
    /// False when the contract was already recorded and nothing was deployed.
    pub newly_deployed: bool,
    pub verifications: Vec<VerificationOutcome>,
}

/// Result of [ProxyDeployer::upgrade].
#[derive(Debug)]
pub struct ProxyUpgrade {
    pub proxy: Address,
    pub implementation: Address,
    pub tx_hash: TxHash,
    pub version: u32,
    pub verifications: Vec<VerificationOutcome>,
}

/// Deploys contracts, behind an ERC-1967 proxy when they are upgradeable, and upgrades them.
pub struct ProxyDeployer {
    ctx: DeployContext,
    store: Option<ConfigStore<OzLedger>>,
}

impl ProxyDeployer {
    pub fn new(ctx: DeployContext) -> Result<Self, DeployError> {
        let store = ctx.ledger_store(LedgerKind::OzProxy)?;
        Ok(Self { ctx, store })
    }

    pub fn ledger(&self) -> Result<OzLedger, DeployError> {
        match &self.store {
            Some(store) => Ok(store.read()?.unwrap_or_default()),
            None => Ok(OzLedger::default()),
        }
    }

    fn save(&self, ledger: &OzLedger) -> Result<(), DeployError> {
        match &self.store {
            Some(store) => store.write(ledger),
            None => Ok(()),
        }
    }

    /// Deploy `name`. Upgradeable contracts are deployed behind an `ERC1967Proxy` and
    /// initialized with `initializer(args)`; other contracts get `args` as constructor arguments.
    pub async fn deploy(
        &self,
        name: &str,
        args: Vec<DynSolValue>,
        initializer: &str,
    ) -> Result<ProxyDeployment, DeployError> {
        let mut ledger = self.ledger()?;
        if let Some(address) = ledger.contract(name) {
            tracing::warn!("Proxy contract for [{name}] is already deployed at [{address}]");
            return Ok(ProxyDeployment {
                address,
                implementation: ledger.implementation(name).map(|(_, address)| address),
                version: ledger.implementation(name).map(|(version, _)| version),
                newly_deployed: false,
                verifications: Vec::new(),
            });
        }
        if let Some(version) = ledger.versions_of(name).first() {
            return Err(DeployError::precondition(format!(
                "Proxy contract [{name}] has an implementation recorded in [v{version}]; delete all versions to redeploy the contract"
            )));
        }

        let artifact = self.ctx.registry.require(name)?;
        let confirmations = self.ctx.network.required_confirmations();

        if !artifact.is_upgradeable() {
            let init_code = artifact.init_code(&args)?;
            let contract = deploy_contract(self.ctx.chain.as_ref(), init_code, confirmations)
                .await
                .map_err(DeployError::ChainSubmission)?;
            tracing::info!("Contract [{name}] is successfully deployed at [{}]", contract.address);
            if self.store.is_some() {
                ledger.contracts.insert(name.to_string(), contract.address);
                self.save(&ledger)?;
            }
            let verifications =
                self.verify([VerificationTarget::new(contract.address, name)]).await;
            return Ok(ProxyDeployment {
                address: contract.address,
                implementation: None,
                version: None,
                newly_deployed: true,
                verifications,
            });
        }

        let init_data = initializer_calldata(artifact, initializer, &args)?;
        let proxy_artifact = self.ctx.registry.require(ERC1967_PROXY_CONTRACT)?;

        let implementation =
            deploy_contract(self.ctx.chain.as_ref(), artifact.init_code(&[])?, confirmations)
                .await
                .map_err(DeployError::ChainSubmission)?;
        tracing::debug!(
            "Implementation for [{name}] deployed at [{}]: tx_hash = {}",
            implementation.address,
            implementation.tx_hash
        );

        let proxy_init_code = proxy_artifact.init_code(&[
            DynSolValue::Address(implementation.address),
            DynSolValue::Bytes(init_data.to_vec()),
        ])?;
        let proxy = deploy_contract(self.ctx.chain.as_ref(), proxy_init_code, confirmations)
            .await
            .map_err(DeployError::ChainSubmission)?;
        tracing::info!("Proxy contract [{name}] is successfully deployed at [{}]", proxy.address);

        let mut version = None;
        let mut implementation_address = implementation.address;
        if self.store.is_some() {
            ledger.contracts.insert(name.to_string(), proxy.address);
            self.save(&ledger)?;

            implementation_address = self.read_implementation(proxy.address).await?;
            version = Some(ledger.record_implementation(name, implementation_address));
            self.save(&ledger)?;
            tracing::info!(
                "Implementation contract for [{name}] is successfully deployed at [{implementation_address}]"
            );
        }

        let verifications = self
            .verify([
                VerificationTarget::new(implementation_address, name),
                VerificationTarget::new(proxy.address, ERC1967_PROXY_CONTRACT),
            ])
            .await;

        Ok(ProxyDeployment {
            address: proxy.address,
            implementation: Some(implementation_address),
            version,
            newly_deployed: true,
            verifications,
        })
    }

    /// Deploy a new implementation of `name` and point its UUPS proxy at it, calling `call` on
    /// the proxy in the same transaction.
    pub async fn upgrade(
        &self,
        name: &str,
        call: Option<UpgradeCall>,
    ) -> Result<ProxyUpgrade, DeployError> {
        let mut ledger = self.ledger()?;
        let Some(proxy) = ledger.contract(name) else {
            return Err(DeployError::precondition(format!(
                "Cannot upgrade non existent proxy contract [{name}] on {}",
                self.ctx.network
            )));
        };
        let artifact = self.ctx.registry.require(name)?;
        if !artifact.is_upgradeable() {
            return Err(DeployError::precondition(format!(
                "Contract [{name}] is not upgradeable"
            )));
        }
        let data = match &call {
            Some(call) => artifact.encode_call(&call.function, &call.args)?,
            None => Bytes::new(),
        };

        let confirmations = self.ctx.network.required_confirmations();
        let implementation =
            deploy_contract(self.ctx.chain.as_ref(), artifact.init_code(&[])?, confirmations)
                .await
                .map_err(DeployError::ChainSubmission)?;
        tracing::debug!(
            "New implementation for [{name}] deployed at [{}]",
            implementation.address
        );

        let tx_hash = self
            .send_upgrade(proxy, implementation.address, data)
            .await
            .map_err(DeployError::ChainSubmission)?;
        tracing::info!("Proxy contract [{name}] at [{proxy}] upgraded: tx_hash = {tx_hash}");

        let implementation_address = self.read_implementation(proxy).await?;
        let version = ledger.record_implementation(name, implementation_address);
        self.save(&ledger)?;

        let verifications =
            self.verify([VerificationTarget::new(implementation_address, name)]).await;

        Ok(ProxyUpgrade {
            proxy,
            implementation: implementation_address,
            tx_hash,
            version,
            verifications,
        })
    }

    async fn send_upgrade(
        &self,
        proxy: Address,
        implementation: Address,
        data: Bytes,
    ) -> anyhow::Result<TxHash> {
        let calldata = upgrade_to_and_call_calldata(implementation, data);
        let tx_hash = self.ctx.chain.send_transaction(proxy, calldata).await?;
        let outcome = self
            .ctx
            .chain
            .wait_for_receipt(tx_hash, self.ctx.network.required_confirmations())
            .await?;
        ensure!(outcome.success, "Upgrade transaction reverted: tx_hash = {tx_hash}");
        Ok(tx_hash)
    }

    async fn read_implementation(&self, proxy: Address) -> Result<Address, DeployError> {
        let word = self
            .ctx
            .chain
            .storage_at(proxy, ERC1967_IMPLEMENTATION_SLOT)
            .await
            .with_context(|| format!("Failed to read the implementation of proxy {proxy}"))
            .map_err(DeployError::ChainSubmission)?;
        Ok(Address::from_word(word))
    }

    async fn verify(
        &self,
        targets: impl IntoIterator<Item = VerificationTarget>,
    ) -> Vec<VerificationOutcome> {
        match self.ctx.active_verifier() {
            Some(verifier) => verify_all(verifier, targets).await,
            None => Vec::new(),
        }
    }
}

fn initializer_calldata(
    artifact: &ContractArtifact,
    initializer: &str,
    args: &[DynSolValue],
) -> Result<Bytes, DeployError> {
    if artifact.has_function(initializer) {
        return artifact.encode_call(initializer, args);
    }
    if !args.is_empty() {
        return Err(DeployError::precondition(format!(
            "Contract [{}] has no initializer [{initializer}] but {} argument(s) were given",
            artifact.name,
            args.len()
        )));
    }
    Ok(Bytes::new())
}
