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

//! Source verification of deployed contracts on a block explorer.

use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use url::Url;

use crate::DeployError;

/// Submits contract sources for verification.
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify(&self, address: Address, contract_name: &str) -> anyhow::Result<()>;
}

/// A contract that should be verified after a deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationTarget {
    pub address: Address,
    pub contract_name: String,
}

impl VerificationTarget {
    pub fn new(address: Address, contract_name: impl Into<String>) -> Self {
        Self { address, contract_name: contract_name.into() }
    }
}

/// Result of verifying one contract.
#[derive(Debug)]
pub struct VerificationOutcome {
    pub target: VerificationTarget,
    pub result: Result<(), DeployError>,
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        self.result.is_ok()
    }
}

/// Verify each target in order. Failures are logged and returned, never raised.
pub async fn verify_all(
    verifier: &dyn SourceVerifier,
    targets: impl IntoIterator<Item = VerificationTarget>,
) -> Vec<VerificationOutcome> {
    let mut outcomes = Vec::new();
    for target in targets {
        let result = match verifier.verify(target.address, &target.contract_name).await {
            Ok(()) => {
                tracing::info!(
                    "Contract [{}] at [{}] is successfully verified",
                    target.contract_name,
                    target.address
                );
                Ok(())
            }
            Err(err) => {
                // Explorer errors tend to be long; the first line carries the reason.
                let message = format!("{err:#}").lines().next().unwrap_or_default().to_string();
                tracing::error!(
                    "Verification of [{}] at [{}] failed: {message}",
                    target.contract_name,
                    target.address
                );
                Err(DeployError::Verification { address: target.address, message })
            }
        };
        outcomes.push(VerificationOutcome { target, result });
    }
    outcomes
}

/// [SourceVerifier] that runs `forge verify-contract` in a foundry project.
#[derive(Clone, Debug)]
pub struct ForgeVerifier {
    /// Root of the foundry project holding the contract sources.
    pub project_root: PathBuf,
    pub chain_id: u64,
    pub etherscan_api_key: Option<String>,
    /// Verification endpoint for explorers other than Etherscan.
    pub verifier_url: Option<Url>,
}

impl ForgeVerifier {
    pub fn new(project_root: impl Into<PathBuf>, chain_id: u64) -> Self {
        Self { project_root: project_root.into(), chain_id, etherscan_api_key: None, verifier_url: None }
    }

    pub fn with_etherscan_api_key(self, key: Option<String>) -> Self {
        Self { etherscan_api_key: key, ..self }
    }

    pub fn with_verifier_url(self, url: Option<Url>) -> Self {
        Self { verifier_url: url, ..self }
    }

    fn args(&self, address: Address, contract_name: &str) -> Vec<String> {
        let mut args = vec![
            "verify-contract".to_string(),
            format!("{address:#x}"),
            contract_name.to_string(),
            "--chain".to_string(),
            self.chain_id.to_string(),
            "--watch".to_string(),
        ];
        if let Some(key) = &self.etherscan_api_key {
            args.extend(["--etherscan-api-key".to_string(), key.clone()]);
        }
        if let Some(url) = &self.verifier_url {
            args.extend(["--verifier-url".to_string(), url.to_string()]);
        }
        args
    }
}

#[async_trait]
impl SourceVerifier for ForgeVerifier {
    async fn verify(&self, address: Address, contract_name: &str) -> anyhow::Result<()> {
        tracing::debug!("Running forge verify-contract for [{contract_name}] at [{address}]");
        let output = Command::new("forge")
            .args(self.args(address, contract_name))
            .current_dir(&self.project_root)
            .output()
            .await
            .context("Failed to run forge; is foundry installed?")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("forge verify-contract exited with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy::primitives::address;

    use super::*;

    struct FailFor(Address, Mutex<Vec<Address>>);

    #[async_trait]
    impl SourceVerifier for FailFor {
        async fn verify(&self, address: Address, _contract_name: &str) -> anyhow::Result<()> {
            self.1.lock().unwrap().push(address);
            if address == self.0 {
                bail!("Already Verified\nmore details");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn failures_are_collected_and_processing_continues() {
        let a = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        let b = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
        let c = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
        let verifier = FailFor(b, Mutex::new(Vec::new()));

        let outcomes = verify_all(
            &verifier,
            [
                VerificationTarget::new(a, "Diamond"),
                VerificationTarget::new(b, "OwnershipFacet"),
                VerificationTarget::new(c, "PausableFacet"),
            ],
        )
        .await;

        assert_eq!(*verifier.1.lock().unwrap(), vec![a, b, c]);
        assert_eq!(outcomes.iter().filter(|o| o.is_verified()).count(), 2);
        match &outcomes[1].result {
            Err(DeployError::Verification { address, message }) => {
                assert_eq!(*address, b);
                assert_eq!(message, "Already Verified");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn forge_args() {
        let verifier = ForgeVerifier::new(".", 11155111)
            .with_etherscan_api_key(Some("KEY".to_string()))
            .with_verifier_url(Some("https://api-sepolia.blastscan.io/api".parse().unwrap()));
        let args = verifier.args(address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"), "Diamond");
        assert_eq!(
            args,
            vec![
                "verify-contract",
                "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                "Diamond",
                "--chain",
                "11155111",
                "--watch",
                "--etherscan-api-key",
                "KEY",
                "--verifier-url",
                "https://api-sepolia.blastscan.io/api",
            ]
        );
    }
}
