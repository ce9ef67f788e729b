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


use alloy::signers::local::PrivateKeySigner;
use anyhow::ensure;
use clap::Args;

/// Command to print fresh private keys.
#[derive(Args, Clone, Debug)]
pub struct GenerateKeys {
    /// Number of keys to generate.
    #[clap(long, default_value_t = 5)]
    pub count: usize,
}

impl GenerateKeys {
    /// Run the [GenerateKeys] command.
    pub fn run(&self) -> anyhow::Result<()> {
        ensure!(self.count > 0, "--count must be at least 1");
        for _ in 0..self.count {
            let signer = PrivateKeySigner::random();
            println!("{} 0x{}", signer.address(), hex::encode(signer.to_bytes()));
        }
        Ok(())
    }
}
