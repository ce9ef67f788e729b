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


use std::path::PathBuf;

use alloy::primitives::Address;
use clap::Args;
use diamond_deploy::DiamondDeployer;

use super::{print_report, CutManifest};
use crate::{commands::confirm, config::GlobalConfig};

/// Command to apply a batch of facet cuts to a diamond proxy.
#[derive(Args, Clone, Debug)]
pub struct DiamondUpgrade {
    /// Name of the diamond proxy contract.
    pub proxy: String,
    /// JSON or YAML file listing the cuts to apply.
    #[clap(long)]
    pub manifest: PathBuf,
    /// Address of the proxy.
    ///
    /// Required on networks that keep no ledger. Elsewhere it must match the ledger entry.
    #[clap(long)]
    pub proxy_address: Option<Address>,
}

impl DiamondUpgrade {
    /// Run the [DiamondUpgrade] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let cuts = CutManifest::load(&self.manifest)?.into_cuts()?;
        let ctx = global_config.deploy_context().await?;
        confirm(
            &format!("Applying {} facet cut(s) to diamond proxy [{}]", cuts.len(), self.proxy),
            &ctx.network,
            global_config.yes,
        )?;

        let deployer = DiamondDeployer::new(ctx)?;
        let report = deployer.upgrade_diamond(&self.proxy, cuts, self.proxy_address).await?;
        println!("Diamond proxy [{}] at {}", self.proxy, report.proxy_address);
        print_report(&report)
    }
}
