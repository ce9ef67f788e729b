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


use anyhow::Context;
use clap::Args;
use diamond_deploy::{ProxyDeployer, UpgradeCall};

use super::print_verifications;
use crate::{commands::confirm, config::GlobalConfig};

/// Command to upgrade the UUPS proxy of a contract.
#[derive(Args, Clone, Debug)]
pub struct OzUpgrade {
    /// Name of the contract in the artifacts directory.
    pub name: String,
    /// Function of the new implementation to call on the proxy during the upgrade.
    #[clap(long)]
    pub call: Option<String>,
    /// Argument of the upgrade call. May be repeated.
    #[clap(long = "arg", requires = "call")]
    pub args: Vec<String>,
}

impl OzUpgrade {
    /// Run the [OzUpgrade] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let ctx = global_config.deploy_context().await?;
        let call = match &self.call {
            Some(function) => {
                let args = ctx
                    .registry
                    .require(&self.name)?
                    .parse_call_args(function, &self.args)
                    .with_context(|| format!("Failed to parse arguments for [{function}]"))?;
                Some(UpgradeCall { function: function.clone(), args })
            }
            None => None,
        };
        confirm(&format!("Upgrading [{}]", self.name), &ctx.network, global_config.yes)?;

        let deployer = ProxyDeployer::new(ctx)?;
        let upgrade = deployer.upgrade(&self.name, call).await?;
        println!(
            "[{}] at {} upgraded to {} (v{}): tx_hash = {}",
            self.name, upgrade.proxy, upgrade.implementation, upgrade.version, upgrade.tx_hash
        );
        print_verifications(&upgrade.verifications);
        Ok(())
    }
}
