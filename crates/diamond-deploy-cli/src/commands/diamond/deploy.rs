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


use std::str::FromStr;

use alloy::primitives::Address;
use anyhow::Context;
use clap::Args;
use diamond_deploy::{
    diamond::INITIALIZE_FUNCTION, DiamondDeployer, DiamondDeployment, DiamondSpec, FacetSource,
};

use super::print_report;
use crate::{commands::confirm, config::GlobalConfig};

/// A facet of the initial cut: `NAME` to deploy it, or `NAME=ADDRESS` to use a deployed one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetArg(pub FacetSource);

impl FromStr for FacetArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, address)) = s.split_once('=') else {
            if s.is_empty() {
                return Err("missing facet name".to_string());
            }
            return Ok(Self(FacetSource::Deploy(s.to_string())));
        };
        if name.is_empty() {
            return Err(format!("missing facet name in {s}"));
        }
        let address: Address =
            address.parse().map_err(|e| format!("invalid address {address}: {e}"))?;
        Ok(Self(FacetSource::Existing { name: name.to_string(), address }))
    }
}

/// Command to deploy a diamond proxy with its initial facets.
#[derive(Args, Clone, Debug)]
pub struct DiamondDeploy {
    /// Name of the diamond proxy contract in the artifacts directory.
    pub proxy: String,
    /// Facet to add, as NAME to deploy it or NAME=ADDRESS to use a deployed one. May be repeated;
    /// cuts keep the given order.
    #[clap(long = "facet")]
    pub facets: Vec<FacetArg>,
    /// Argument of the proxy's `initialize` function, in declaration order. May be repeated.
    #[clap(long = "init-arg")]
    pub init_args: Vec<String>,
}

impl DiamondDeploy {
    /// Run the [DiamondDeploy] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let ctx = global_config.deploy_context().await?;
        let init_args = if self.init_args.is_empty() {
            Vec::new()
        } else {
            ctx.registry
                .require(&self.proxy)?
                .parse_call_args(INITIALIZE_FUNCTION, &self.init_args)
                .context("Failed to parse initializer arguments")?
        };
        confirm(
            &format!("Deploying diamond proxy [{}]", self.proxy),
            &ctx.network,
            global_config.yes,
        )?;

        let facets = self.facets.iter().map(|facet| facet.0.clone()).collect();
        let deployer = DiamondDeployer::new(ctx)?;
        let deployment = deployer
            .deploy_and_upgrade_diamond(
                DiamondSpec::new(&self.proxy).with_init_args(init_args),
                facets,
            )
            .await?;

        match deployment {
            DiamondDeployment::AlreadyDeployed { address } => {
                println!("Diamond proxy [{}] is already deployed at {address}", self.proxy);
                Ok(())
            }
            DiamondDeployment::Deployed { address, tx_hash, report } => {
                println!("Diamond proxy [{}] deployed at {address}: tx_hash = {tx_hash}", self.proxy);
                print_report(&report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use clap::Parser;

    use super::*;
    use crate::commands::{diamond::DiamondCommands, Command, MainArgs};

    #[test]
    fn facet_parses_name_or_name_and_address() {
        let facet: FacetArg =
            "OwnershipFacet=0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap();
        assert_eq!(
            facet.0,
            FacetSource::Existing {
                name: "OwnershipFacet".to_string(),
                address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            }
        );
        let facet: FacetArg = "PausableFacet".parse().unwrap();
        assert_eq!(facet.0, FacetSource::Deploy("PausableFacet".to_string()));

        "".parse::<FacetArg>().unwrap_err();
        "=0x5FbDB2315678afecb367f032d93F642f64180aa3".parse::<FacetArg>().unwrap_err();
        "OwnershipFacet=0x1234".parse::<FacetArg>().unwrap_err();
    }

    #[test]
    fn facets_keep_the_given_order() {
        let args = MainArgs::try_parse_from([
            "diamond-deploy",
            "diamond",
            "deploy",
            "Diamond",
            "--facet",
            "PausableFacet",
            "--facet",
            "OwnershipFacet=0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "--facet",
            "ERC20Facet",
            "--init-arg",
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
        ])
        .unwrap();
        let Command::Diamond(DiamondCommands::Deploy(cmd)) = args.command else {
            panic!("expected diamond deploy");
        };
        assert_eq!(cmd.proxy, "Diamond");
        let facets: Vec<FacetSource> = cmd.facets.into_iter().map(|facet| facet.0).collect();
        assert_eq!(
            facets,
            vec![
                FacetSource::Deploy("PausableFacet".to_string()),
                FacetSource::Existing {
                    name: "OwnershipFacet".to_string(),
                    address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
                },
                FacetSource::Deploy("ERC20Facet".to_string()),
            ]
        );
        assert_eq!(cmd.init_args.len(), 1);
    }
}
