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

//! Deployment and upgrade orchestration for diamond proxies and ERC-1967 proxies.
//!
//! The main entry points are [DiamondDeployer], which deploys diamond proxies and applies
//! batches of facet cuts to them, and [ProxyDeployer], which deploys and upgrades contracts
//! behind ERC-1967 proxies. Both record what they did in a JSON ledger per network, see
//! [ledger] and [oz::OzLedger].

pub mod chain;
pub mod config;
pub mod contracts;
pub mod context;
pub mod diamond;
mod error;
pub mod ledger;
pub mod network;
pub mod oz;
pub mod registry;
pub mod verify;

pub use chain::{AlloyChainClient, ChainClient};
pub use context::{DeployContext, DeployContextBuilder};
pub use diamond::{
    CutOutcome, CutReport, CutSpec, DiamondDeployer, DiamondDeployment, DiamondSpec, FacetSource,
};
pub use error::DeployError;
pub use ledger::{CutStatus, DiamondLedger, FacetCutAction};
pub use network::{Network, NetworkKind};
pub use oz::{ProxyDeployer, UpgradeCall};
pub use registry::{ArtifactRegistry, ContractArtifact};
pub use verify::{ForgeVerifier, SourceVerifier};
