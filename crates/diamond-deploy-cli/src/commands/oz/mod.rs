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


//! Commands of the diamond-deploy CLI for contracts behind ERC-1967 proxies.

mod deploy;
mod upgrade;

pub use deploy::OzDeploy;
pub use upgrade::OzUpgrade;

use clap::Subcommand;
use diamond_deploy::verify::VerificationOutcome;

use crate::config::GlobalConfig;

/// Commands for ERC-1967 proxies.
#[derive(Subcommand, Clone, Debug)]
pub enum OzCommands {
    /// Deploy a contract, behind an ERC-1967 proxy when it is upgradeable.
    Deploy(OzDeploy),
    /// Point the UUPS proxy of a contract at a newly deployed implementation.
    Upgrade(OzUpgrade),
}

impl OzCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Deploy(cmd) => cmd.run(global_config).await,
            Self::Upgrade(cmd) => cmd.run(global_config).await,
        }
    }
}

fn print_verifications(verifications: &[VerificationOutcome]) {
    for verification in verifications {
        let status = if verification.is_verified() { "verified" } else { "not verified" };
        println!(
            "  {} at {}: {status}",
            verification.target.contract_name, verification.target.address
        );
    }
}
