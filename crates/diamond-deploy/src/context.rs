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

use std::{path::PathBuf, sync::Arc};

use derive_builder::Builder;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    chain::ChainClient,
    config::ConfigStore,
    network::{LedgerKind, Network},
    registry::ArtifactRegistry,
    verify::SourceVerifier,
    DeployError,
};

/// Everything a deployer needs to talk to one network.
#[derive(Clone, Builder)]
pub struct DeployContext {
    /// Client used for all chain reads and writes.
    pub chain: Arc<dyn ChainClient>,

    /// Compiled contracts available for deployment.
    pub registry: Arc<ArtifactRegistry>,

    pub network: Network,

    /// Verifier for newly deployed contracts. Only used on live networks.
    #[builder(setter(strip_option), default)]
    pub verifier: Option<Arc<dyn SourceVerifier>>,

    /// Directory holding the per-network ledger files.
    #[builder(setter(into), default = "PathBuf::from(\"deployment\")")]
    pub deployment_dir: PathBuf,
}

impl DeployContext {
    /// Create a new [DeployContextBuilder].
    pub fn builder() -> DeployContextBuilder {
        Default::default()
    }

    /// Open the ledger of the given kind, or `None` on networks that keep no ledger.
    pub(crate) fn ledger_store<T>(
        &self,
        kind: LedgerKind,
    ) -> Result<Option<ConfigStore<T>>, DeployError>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.network.persists_ledger() {
            tracing::debug!("Network {} keeps no deployment ledger", self.network);
            return Ok(None);
        }
        ConfigStore::new(self.network.ledger_path(&self.deployment_dir, kind)).map(Some)
    }

    /// The verifier to use for this network, if sources are verified here.
    pub(crate) fn active_verifier(&self) -> Option<&dyn SourceVerifier> {
        if !self.network.verifies_sources() {
            return None;
        }
        if self.verifier.is_none() {
            tracing::warn!("No source verifier configured for {}; skipping verification", self.network);
        }
        self.verifier.as_deref()
    }
}
