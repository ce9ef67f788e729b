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
use diamond_deploy::{oz::DEFAULT_INITIALIZER, ProxyDeployer};

use super::print_verifications;
use crate::{commands::confirm, config::GlobalConfig};

/// Command to deploy a contract, behind an ERC-1967 proxy when it is upgradeable.
#[derive(Args, Clone, Debug)]
pub struct OzDeploy {
    /// Name of the contract in the artifacts directory.
    pub name: String,
    /// Initializer argument for upgradeable contracts, constructor argument otherwise. May be
    /// repeated.
    #[clap(long = "arg")]
    pub args: Vec<String>,
    /// Function called on the proxy when it is deployed.
    #[clap(long, default_value = DEFAULT_INITIALIZER)]
    pub initializer: String,
}

impl OzDeploy {
    /// Run the [OzDeploy] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let ctx = global_config.deploy_context().await?;
        let artifact = ctx.registry.require(&self.name)?;
        let args = if !artifact.is_upgradeable() {
            artifact.parse_constructor_args(&self.args)
        } else if self.args.is_empty() {
            Ok(Vec::new())
        } else {
            artifact.parse_call_args(&self.initializer, &self.args)
        }
        .with_context(|| format!("Failed to parse arguments for [{}]", self.name))?;
        confirm(&format!("Deploying [{}]", self.name), &ctx.network, global_config.yes)?;

        let deployer = ProxyDeployer::new(ctx)?;
        let deployment = deployer.deploy(&self.name, args, &self.initializer).await?;
        if !deployment.newly_deployed {
            println!("[{}] is already deployed at {}", self.name, deployment.address);
            return Ok(());
        }
        match deployment.implementation {
            Some(implementation) => println!(
                "[{}] deployed at {} with implementation {implementation}",
                self.name, deployment.address
            ),
            None => println!("[{}] deployed at {}", self.name, deployment.address),
        }
        if let Some(version) = deployment.version {
            println!("Implementation recorded as v{version}");
        }
        print_verifications(&deployment.verifications);
        Ok(())
    }
}
