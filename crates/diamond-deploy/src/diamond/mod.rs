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

//! Deployment and upgrade of diamond proxies.
//!
//! A diamond proxy routes each function selector to a facet contract. Facets are changed with
//! `diamondCut`, which takes a batch of cuts that each add, replace or remove a set of selectors.
//! [DiamondDeployer] deploys facets as needed, sends one `diamondCut` transaction per batch and
//! keeps a ledger of every cut attempted on each proxy.

use std::ops::Range;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, Selector, B256},
};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{deploy_contract, DeployedContract},
    config::ConfigStore,
    context::DeployContext,
    contracts::{diamond_cut_calldata, IDiamondWritable::FacetCut},
    ledger::{CutRecord, CutStatus, DiamondLedger, FacetCutAction},
    network::LedgerKind,
    verify::{verify_all, VerificationTarget},
    DeployError,
};

mod report;
mod validate;

pub use report::{CutOutcome, CutReport, DiamondDeployment, FacetResolution, SubmissionOutcome};

/// Name of the function called on the proxy, within the first cut, to initialize it.
pub const INITIALIZE_FUNCTION: &str = "initialize";

/// The diamond proxy contract to deploy.
#[derive(Clone, Debug)]
pub struct DiamondSpec {
    /// Name of the proxy contract in the artifact registry.
    pub contract_name: String,
    /// Arguments to the proxy's `initialize` function.
    pub init_args: Vec<DynSolValue>,
}

impl DiamondSpec {
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self { contract_name: contract_name.into(), init_args: Vec::new() }
    }

    pub fn with_init_args(self, init_args: Vec<DynSolValue>) -> Self {
        Self { init_args, ..self }
    }
}

/// A facet added to a newly deployed diamond.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FacetSource {
    /// Deploy the named contract from the artifact registry.
    Deploy(String),
    /// Use a facet that is already on chain.
    Existing { name: String, address: Address },
}

impl FacetSource {
    fn into_cut(self) -> CutSpec {
        match self {
            Self::Deploy(name) => CutSpec::new(name, FacetCutAction::Add),
            Self::Existing { name, address } => {
                CutSpec::new(name, FacetCutAction::Add).with_address(address)
            }
        }
    }
}

/// A single requested facet cut.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutSpec {
    pub facet_name: String,
    /// Facet to route the selectors to. When absent, ADD and REPLACE cuts deploy the facet by
    /// name, and REMOVE cuts use the zero address.
    #[serde(default)]
    pub facet_address: Option<Address>,
    /// Selectors to cut. When absent, every function of the facet's artifact is used.
    #[serde(default)]
    pub selectors: Option<Vec<Selector>>,
    pub action: FacetCutAction,
}

impl CutSpec {
    pub fn new(facet_name: impl Into<String>, action: FacetCutAction) -> Self {
        Self { facet_name: facet_name.into(), facet_address: None, selectors: None, action }
    }

    pub fn with_address(self, address: Address) -> Self {
        Self { facet_address: Some(address), ..self }
    }

    pub fn with_selectors(self, selectors: Vec<Selector>) -> Self {
        Self { selectors: Some(selectors), ..self }
    }
}

/// Deploys diamond proxies and applies facet cuts to them.
pub struct DiamondDeployer {
    ctx: DeployContext,
    store: Option<ConfigStore<DiamondLedger>>,
}

impl DiamondDeployer {
    /// Create a deployer. On networks that keep a ledger, the deployment directory must exist.
    pub fn new(ctx: DeployContext) -> Result<Self, DeployError> {
        let store = ctx.ledger_store(LedgerKind::DiamondProxy)?;
        Ok(Self { ctx, store })
    }

    /// Read the ledger of the target network. Networks without a ledger start empty every time.
    pub fn ledger(&self) -> Result<DiamondLedger, DeployError> {
        match &self.store {
            Some(store) => Ok(store.read()?.unwrap_or_default()),
            None => Ok(DiamondLedger::default()),
        }
    }

    fn save(&self, ledger: &DiamondLedger) -> Result<(), DeployError> {
        match &self.store {
            Some(store) => store.write(ledger),
            None => Ok(()),
        }
    }

    /// Deploy a diamond proxy and add the given facets to it in a single cut, initializing the
    /// proxy in the same transaction.
    ///
    /// Returns [DiamondDeployment::AlreadyDeployed] without sending anything when the ledger
    /// already records the proxy.
    pub async fn deploy_and_upgrade_diamond(
        &self,
        proxy: DiamondSpec,
        facets: Vec<FacetSource>,
    ) -> Result<DiamondDeployment, DeployError> {
        let proxy_name = proxy.contract_name.as_str();
        let mut ledger = self.ledger()?;
        if let Some(record) = ledger.get(proxy_name) {
            tracing::warn!(
                "Diamond proxy [{proxy_name}] is already deployed at [{}] on {}; delete its ledger entry to redeploy",
                record.address,
                self.ctx.network
            );
            return Ok(DiamondDeployment::AlreadyDeployed { address: record.address });
        }

        let artifact = self.ctx.registry.require(proxy_name)?;
        let init_data = if artifact.has_function(INITIALIZE_FUNCTION) {
            Some(artifact.encode_call(INITIALIZE_FUNCTION, &proxy.init_args)?)
        } else if proxy.init_args.is_empty() {
            None
        } else {
            return Err(DeployError::precondition(format!(
                "Diamond proxy [{proxy_name}] has no [{INITIALIZE_FUNCTION}] function but {} argument(s) were given",
                proxy.init_args.len()
            )));
        };

        let cuts: Vec<CutSpec> = facets.into_iter().map(FacetSource::into_cut).collect();
        validate::validate_batch(
            self.ctx.chain.as_ref(),
            &ledger,
            proxy_name,
            &cuts,
            &self.ctx.registry,
        )
        .await?;

        let init_code = artifact.init_code(&[])?;
        let deployed = deploy_contract(
            self.ctx.chain.as_ref(),
            init_code,
            self.ctx.network.required_confirmations(),
        )
        .await
        .map_err(DeployError::ChainSubmission)?;
        tracing::info!(
            "Diamond proxy [{proxy_name}] deployed at [{}]: tx_hash = {}",
            deployed.address,
            deployed.tx_hash
        );

        ledger.insert_proxy(proxy_name, deployed.address, deployed.tx_hash)?;
        self.save(&ledger)?;

        let initializer = init_data.map(|data| (deployed.address, data));
        let report = self
            .run_cuts(
                &mut ledger,
                proxy_name,
                deployed.address,
                cuts,
                initializer,
                vec![VerificationTarget::new(deployed.address, proxy_name)],
            )
            .await?;

        Ok(DiamondDeployment::Deployed {
            address: deployed.address,
            tx_hash: deployed.tx_hash,
            report,
        })
    }

    /// Apply a batch of cuts to an existing diamond proxy.
    ///
    /// On networks that keep a ledger, the proxy must be recorded there and `proxy_address`, when
    /// given, must match the record. On other networks `proxy_address` is required.
    pub async fn upgrade_diamond(
        &self,
        proxy_name: &str,
        cuts: Vec<CutSpec>,
        proxy_address: Option<Address>,
    ) -> Result<CutReport, DeployError> {
        let mut ledger = self.ledger()?;
        let address = if self.store.is_some() {
            let Some(record) = ledger.get(proxy_name) else {
                return Err(DeployError::precondition(format!(
                    "Diamond proxy [{proxy_name}] is not deployed on {}",
                    self.ctx.network
                )));
            };
            match proxy_address {
                Some(address) if address != record.address => {
                    return Err(DeployError::precondition(format!(
                        "Diamond proxy [{proxy_name}] is recorded at [{}], not [{address}]",
                        record.address
                    )))
                }
                _ => record.address,
            }
        } else {
            let Some(address) = proxy_address else {
                return Err(DeployError::precondition(format!(
                    "An address for diamond proxy [{proxy_name}] is required on {}",
                    self.ctx.network
                )));
            };
            ledger.insert_proxy(proxy_name, address, B256::ZERO)?;
            address
        };

        validate::validate_batch(
            self.ctx.chain.as_ref(),
            &ledger,
            proxy_name,
            &cuts,
            &self.ctx.registry,
        )
        .await?;

        self.run_cuts(&mut ledger, proxy_name, address, cuts, None, Vec::new()).await
    }

    /// Resolve, record, submit and verify a validated batch.
    async fn run_cuts(
        &self,
        ledger: &mut DiamondLedger,
        proxy_name: &str,
        proxy_address: Address,
        cuts: Vec<CutSpec>,
        initializer: Option<(Address, Bytes)>,
        mut verification_targets: Vec<VerificationTarget>,
    ) -> Result<CutReport, DeployError> {
        let mut outcomes = Vec::with_capacity(cuts.len());
        // Facets are deployed one at a time so that nonces follow the order of the batch.
        for cut in cuts {
            let outcome = self.resolve_facet(cut).await;
            // Every facet the batch routes selectors to is verified, including existing ones.
            let target = match &outcome.resolution {
                FacetResolution::Deployed(contract) => Some(contract.address),
                FacetResolution::Bound(address)
                    if outcome.action.requires_target() && !address.is_zero() =>
                {
                    Some(*address)
                }
                _ => None,
            };
            if let Some(address) = target {
                verification_targets.push(VerificationTarget::new(address, &outcome.facet_name));
            }
            outcomes.push(outcome);
        }

        let records = outcomes.iter().map(|outcome| {
            let status =
                if outcome.is_submitted() { CutStatus::Pending } else { CutStatus::Failed };
            CutRecord::new(
                &outcome.facet_name,
                outcome.facet_address(),
                outcome.selectors.clone(),
                outcome.action,
                status,
            )
        });
        let batch = ledger.append_batch(proxy_name, records)?;
        self.save(ledger)?;

        let submission = self.submit(proxy_address, &outcomes, initializer).await;
        if !matches!(submission, SubmissionOutcome::NotSubmitted) {
            self.settle(ledger, proxy_name, batch, submission.is_confirmed())?;
        }

        let verifications = match self.ctx.active_verifier() {
            Some(verifier) => verify_all(verifier, verification_targets).await,
            None => Vec::new(),
        };

        Ok(CutReport { proxy_address, cuts: outcomes, submission, verifications })
    }

    async fn resolve_facet(&self, cut: CutSpec) -> CutOutcome {
        let selectors = validate::cut_selectors(&cut, &self.ctx.registry).unwrap_or_default();
        let resolution = match (cut.action, cut.facet_address) {
            (FacetCutAction::Remove, _) => FacetResolution::Bound(Address::ZERO),
            (_, Some(address)) => {
                if !self.ctx.registry.contains(&cut.facet_name) {
                    tracing::debug!(
                        "Facet [{}] at [{address}] has no known artifact; using the given selectors",
                        cut.facet_name
                    );
                }
                FacetResolution::Bound(address)
            }
            (_, None) => match self.deploy_facet(&cut.facet_name).await {
                Ok(contract) => FacetResolution::Deployed(contract),
                Err(err) => {
                    tracing::error!(
                        "Failed to deploy facet [{}]; dropping it from the cut: {err}",
                        cut.facet_name
                    );
                    FacetResolution::Failed(err)
                }
            },
        };
        CutOutcome { facet_name: cut.facet_name, action: cut.action, selectors, resolution }
    }

    async fn deploy_facet(&self, name: &str) -> Result<DeployedContract, DeployError> {
        let init_code = self.ctx.registry.require(name)?.init_code(&[])?;
        let contract = deploy_contract(
            self.ctx.chain.as_ref(),
            init_code,
            self.ctx.network.required_confirmations(),
        )
        .await
        .map_err(DeployError::ChainSubmission)?;
        tracing::info!(
            "Facet [{name}] deployed at [{}]: tx_hash = {}",
            contract.address,
            contract.tx_hash
        );
        Ok(contract)
    }

    async fn submit(
        &self,
        proxy_address: Address,
        outcomes: &[CutOutcome],
        initializer: Option<(Address, Bytes)>,
    ) -> SubmissionOutcome {
        let cuts: Vec<FacetCut> = outcomes
            .iter()
            .filter(|outcome| outcome.is_submitted())
            .map(|outcome| {
                FacetCut::new(outcome.facet_address(), outcome.action, outcome.selectors.clone())
            })
            .collect();
        if cuts.is_empty() {
            tracing::warn!("No facet of the batch could be resolved; no diamond cut was sent");
            return SubmissionOutcome::NotSubmitted;
        }

        let count = cuts.len();
        let calldata = diamond_cut_calldata(cuts, initializer);
        let tx_hash = match self.ctx.chain.send_transaction(proxy_address, calldata).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                tracing::error!("Failed to send diamond cut to [{proxy_address}]: {err:#}");
                return SubmissionOutcome::Failed {
                    tx_hash: None,
                    error: DeployError::ChainSubmission(err),
                };
            }
        };
        tracing::debug!(%tx_hash, "Sent diamond cut with {count} cut(s)");

        let confirmations = self.ctx.network.required_confirmations();
        match self.ctx.chain.wait_for_receipt(tx_hash, confirmations).await {
            Ok(outcome) if outcome.success => {
                tracing::info!(
                    "Diamond cut on [{proxy_address}] succeeded with {count} cut(s): tx_hash = {tx_hash}"
                );
                SubmissionOutcome::Confirmed { tx_hash, block_number: outcome.block_number }
            }
            Ok(_) => {
                tracing::error!("Diamond cut on [{proxy_address}] reverted: tx_hash = {tx_hash}");
                SubmissionOutcome::Failed {
                    tx_hash: Some(tx_hash),
                    error: DeployError::ChainSubmission(anyhow::anyhow!(
                        "diamond cut transaction {tx_hash} reverted"
                    )),
                }
            }
            Err(err) => {
                tracing::error!("Diamond cut on [{proxy_address}] was not confirmed: {err:#}");
                SubmissionOutcome::Failed {
                    tx_hash: Some(tx_hash),
                    error: DeployError::ChainSubmission(err),
                }
            }
        }
    }

    fn settle(
        &self,
        ledger: &mut DiamondLedger,
        proxy_name: &str,
        batch: Range<usize>,
        succeeded: bool,
    ) -> Result<(), DeployError> {
        ledger.resolve_batch(proxy_name, batch, succeeded)?;
        self.save(ledger)
    }
}
