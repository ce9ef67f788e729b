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


//! Commands of the diamond-deploy CLI.

pub mod diamond;
mod generate_keys;
pub mod oz;

pub use generate_keys::GenerateKeys;

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use diamond_deploy::{Network, NetworkKind};

use crate::config::GlobalConfig;
use diamond::DiamondCommands;
use oz::OzCommands;

/// Deploy and upgrade diamond and ERC-1967 proxy contracts.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct MainArgs {
    #[clap(subcommand)]
    pub command: Command,

    #[clap(flatten, next_help_heading = "Global Options")]
    pub config: GlobalConfig,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Deploy and cut diamond proxies.
    #[clap(subcommand)]
    Diamond(DiamondCommands),
    /// Deploy and upgrade contracts behind ERC-1967 proxies.
    #[clap(subcommand)]
    Oz(OzCommands),
    /// Print fresh private keys with their addresses.
    GenerateKeys(GenerateKeys),
}

impl Command {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Diamond(cmd) => cmd.run(global_config).await,
            Self::Oz(cmd) => cmd.run(global_config).await,
            Self::GenerateKeys(cmd) => cmd.run(),
        }
    }
}

/// Ask the operator to confirm `operation` before sending transactions to a live network.
///
/// Local and ephemeral networks never prompt, and neither does `--yes`.
pub(crate) fn confirm(operation: &str, network: &Network, yes: bool) -> anyhow::Result<()> {
    if yes || network.kind() != NetworkKind::Live {
        return Ok(());
    }
    confirm_from(io::stdin().lock(), operation, network)
}

fn confirm_from(mut input: impl BufRead, operation: &str, network: &Network) -> anyhow::Result<()> {
    let testnet = if network.is_testnet() { "a testnet" } else { "NOT a testnet" };
    println!("{operation} on {network}, which is {testnet}.");
    print!("Type 'yes' to confirm and continue: ");
    io::stdout().flush().ok();
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(|e| anyhow!("failed to read confirmation: {}", e))?;
    if answer.trim().to_lowercase() != "yes" {
        bail!("{operation} cancelled by user");
    }
    Ok(())
}
