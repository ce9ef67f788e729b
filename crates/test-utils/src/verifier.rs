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

use std::{collections::HashSet, sync::Mutex};

use alloy::primitives::Address;
use async_trait::async_trait;
use diamond_deploy::SourceVerifier;

/// [SourceVerifier] that records every request and fails for chosen contract names.
#[derive(Debug, Default)]
pub struct MockVerifier {
    failing: HashSet<String>,
    requests: Mutex<Vec<(Address, String)>>,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make verification of every contract named `contract_name` fail.
    pub fn failing_for(mut self, contract_name: &str) -> Self {
        self.failing.insert(contract_name.to_string());
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<(Address, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn verified_names(&self) -> Vec<String> {
        self.requests().into_iter().map(|(_, name)| name).collect()
    }
}

#[async_trait]
impl SourceVerifier for MockVerifier {
    async fn verify(&self, address: Address, contract_name: &str) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push((address, contract_name.to_string()));
        if self.failing.contains(contract_name) {
            anyhow::bail!("Fail - Unable to verify. Compiled contract deployment bytecode does NOT match");
        }
        Ok(())
    }
}
