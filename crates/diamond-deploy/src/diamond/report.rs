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

use alloy::primitives::{Address, Selector, TxHash};

use crate::{
    chain::DeployedContract, ledger::FacetCutAction, verify::VerificationOutcome, DeployError,
};

/// How the facet of a single cut was obtained.
#[derive(Debug)]
pub enum FacetResolution {
    /// The facet was deployed as part of this call.
    Deployed(DeployedContract),
    /// An existing address was used. REMOVE cuts bind to the zero address.
    Bound(Address),
    /// The facet could not be obtained and the cut was dropped from the batch.
    Failed(DeployError),
}

/// Per-cut result of a diamond cut batch.
#[derive(Debug)]
pub struct CutOutcome {
    pub facet_name: String,
    pub action: FacetCutAction,
    pub selectors: Vec<Selector>,
    pub resolution: FacetResolution,
}

impl CutOutcome {
    /// Whether the cut was included in the submitted transaction.
    pub fn is_submitted(&self) -> bool {
        !matches!(self.resolution, FacetResolution::Failed(_))
    }

    /// Facet address used for the cut, or the zero address when none is known.
    pub fn facet_address(&self) -> Address {
        match &self.resolution {
            FacetResolution::Deployed(contract) => contract.address,
            FacetResolution::Bound(address) => *address,
            FacetResolution::Failed(_) => Address::ZERO,
        }
    }
}

/// Result of the `diamondCut` transaction of a batch.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// No cut of the batch could be resolved, so nothing was sent.
    NotSubmitted,
    Confirmed { tx_hash: TxHash, block_number: Option<u64> },
    Failed { tx_hash: Option<TxHash>, error: DeployError },
}

impl SubmissionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::NotSubmitted => None,
            Self::Confirmed { tx_hash, .. } => Some(*tx_hash),
            Self::Failed { tx_hash, .. } => *tx_hash,
        }
    }
}

/// Everything that happened during one run of the cut pipeline.
#[derive(Debug)]
pub struct CutReport {
    /// Diamond proxy the batch was applied to.
    pub proxy_address: Address,
    /// One entry per requested cut, in request order.
    pub cuts: Vec<CutOutcome>,
    pub submission: SubmissionOutcome,
    /// Empty on networks where sources are not verified.
    pub verifications: Vec<VerificationOutcome>,
}

impl CutReport {
    pub fn submitted_cuts(&self) -> impl Iterator<Item = &CutOutcome> {
        self.cuts.iter().filter(|cut| cut.is_submitted())
    }

    pub fn failed_cuts(&self) -> impl Iterator<Item = &CutOutcome> {
        self.cuts.iter().filter(|cut| !cut.is_submitted())
    }

    /// Contracts deployed as facets during this run.
    pub fn deployed_facets(&self) -> impl Iterator<Item = (&str, &DeployedContract)> {
        self.cuts.iter().filter_map(|cut| match &cut.resolution {
            FacetResolution::Deployed(contract) => Some((cut.facet_name.as_str(), contract)),
            _ => None,
        })
    }

    /// True when every requested cut was submitted and the transaction was confirmed.
    pub fn is_complete(&self) -> bool {
        self.submission.is_confirmed() && self.cuts.iter().all(CutOutcome::is_submitted)
    }
}

/// Result of [crate::diamond::DiamondDeployer::deploy_and_upgrade_diamond].
#[derive(Debug)]
pub enum DiamondDeployment {
    /// The proxy was already recorded in the ledger. Nothing was sent.
    AlreadyDeployed { address: Address },
    Deployed { address: Address, tx_hash: TxHash, report: CutReport },
}

impl DiamondDeployment {
    pub fn address(&self) -> Address {
        match self {
            Self::AlreadyDeployed { address } | Self::Deployed { address, .. } => *address,
        }
    }

    pub fn report(&self) -> Option<&CutReport> {
        match self {
            Self::AlreadyDeployed { .. } => None,
            Self::Deployed { report, .. } => Some(report),
        }
    }
}
