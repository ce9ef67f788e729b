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

use std::{
    fmt,
    path::{Path, PathBuf},
};

pub use alloy_chains::NamedChain;

/// Chain ID used by local development nodes (anvil, hardhat).
pub const DEV_CHAIN_ID: u64 = 31337;

/// Confirmations to wait for on live networks before treating a transaction as final.
pub const LIVE_CONFIRMATIONS: u64 = 6;

/// How a network is treated by the deployers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkKind {
    /// In-process or throwaway chain. Nothing is persisted or verified.
    Ephemeral,
    /// A long-running local node. Ledgers are kept, sources are not verified.
    Local,
    /// A public network.
    Live,
}

/// Kinds of ledger files kept per network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerKind {
    DiamondProxy,
    OzProxy,
}

impl LedgerKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::DiamondProxy => "diamond-proxy.deployment.json",
            Self::OzProxy => "oz-proxy.deployment.json",
        }
    }
}

/// The network a deployment targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    /// Name used to classify the network and to name its ledger files.
    pub name: String,
    /// EIP-155 chain ID.
    pub chain_id: u64,
}

impl Network {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self { name: name.into(), chain_id }
    }

    pub fn kind(&self) -> NetworkKind {
        match self.name.as_str() {
            "hardhat" | "anvil" => NetworkKind::Ephemeral,
            "localhost" => NetworkKind::Local,
            _ => NetworkKind::Live,
        }
    }

    /// Whether deployment ledgers are read and written for this network.
    pub fn persists_ledger(&self) -> bool {
        self.kind() != NetworkKind::Ephemeral
    }

    /// Whether newly deployed contracts should be submitted for source verification.
    pub fn verifies_sources(&self) -> bool {
        self.kind() == NetworkKind::Live
    }

    pub fn required_confirmations(&self) -> u64 {
        match self.kind() {
            NetworkKind::Live => LIVE_CONFIRMATIONS,
            NetworkKind::Local | NetworkKind::Ephemeral => 1,
        }
    }

    pub fn is_testnet(&self) -> bool {
        self.chain_id == DEV_CHAIN_ID
            || NamedChain::try_from(self.chain_id).map(|chain| chain.is_testnet()).unwrap_or(false)
    }

    /// Path of the ledger file of the given kind inside `dir`.
    pub fn ledger_path(&self, dir: impl AsRef<Path>, kind: LedgerKind) -> PathBuf {
        dir.as_ref().join(format!("{}.{}", self.name, kind.suffix()))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (chain ID {})", self.name, self.chain_id)
    }
}
