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


//! Commands of the diamond-deploy CLI for diamond proxies.

mod deploy;
mod manifest;
mod upgrade;

pub use deploy::{DiamondDeploy, FacetArg};
pub use manifest::{CutManifest, ManifestCut};
pub use upgrade::DiamondUpgrade;

use anyhow::ensure;
use clap::Subcommand;
use diamond_deploy::{
    diamond::{FacetResolution, SubmissionOutcome},
    CutReport,
};

use crate::config::GlobalConfig;

/// Commands for diamond proxies.
#[derive(Subcommand, Clone, Debug)]
pub enum DiamondCommands {
    /// Deploy a diamond proxy and add its initial facets in one cut.
    Deploy(DiamondDeploy),
    /// Apply a batch of facet cuts to a deployed diamond proxy.
    Upgrade(DiamondUpgrade),
}

impl DiamondCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Deploy(cmd) => cmd.run(global_config).await,
            Self::Upgrade(cmd) => cmd.run(global_config).await,
        }
    }
}

/// Print the outcome of a cut batch, failing when any part of it did not go through.
fn print_report(report: &CutReport) -> anyhow::Result<()> {
    for cut in &report.cuts {
        match &cut.resolution {
            FacetResolution::Failed(err) => {
                println!("  {} {}: dropped ({err})", cut.action, cut.facet_name)
            }
            _ => println!(
                "  {} {} at {} ({} selectors)",
                cut.action,
                cut.facet_name,
                cut.facet_address(),
                cut.selectors.len()
            ),
        }
    }
    match &report.submission {
        SubmissionOutcome::NotSubmitted => println!("Diamond cut not sent"),
        SubmissionOutcome::Confirmed { tx_hash, .. } => {
            println!("Diamond cut confirmed: tx_hash = {tx_hash}")
        }
        SubmissionOutcome::Failed { error, .. } => println!("Diamond cut failed: {error}"),
    }
    for verification in &report.verifications {
        let status = if verification.is_verified() { "verified" } else { "not verified" };
        println!(
            "  {} at {}: {status}",
            verification.target.contract_name, verification.target.address
        );
    }

    ensure!(
        report.is_complete(),
        "Diamond cut on [{}] did not fully apply; see the deployment ledger for the recorded outcome",
        report.proxy_address
    );
    Ok(())
}
