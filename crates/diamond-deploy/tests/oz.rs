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

//! Integration tests for ERC-1967 proxy deployment and upgrades.

use std::{path::Path, sync::Arc};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{address, Address, U256},
    sol_types::SolCall,
};
use diamond_deploy::{
    contracts::{IUUPSUpgradeable::upgradeToAndCallCall, ERC1967_PROXY_CONTRACT},
    network::{NamedChain, DEV_CHAIN_ID},
    oz::{OzLedger, DEFAULT_INITIALIZER},
    DeployContext, DeployError, Network, ProxyDeployer, UpgradeCall,
};
use diamond_deploy_test_utils::{
    fixtures::{self, LOCK, VAULT},
    MockChain, MockVerifier,
};
use tempfile::TempDir;
use tracing_test::traced_test;

const OWNER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

fn chain() -> Arc<MockChain> {
    Arc::new(MockChain::new().with_proxy_bytecode(fixtures::bytecode(ERC1967_PROXY_CONTRACT)))
}

fn deployer(
    chain: &Arc<MockChain>,
    network: Network,
    dir: &Path,
    verifier: Option<&Arc<MockVerifier>>,
) -> ProxyDeployer {
    let mut builder = DeployContext::builder();
    builder
        .chain(chain.clone())
        .registry(Arc::new(fixtures::registry()))
        .network(network)
        .deployment_dir(dir);
    if let Some(verifier) = verifier {
        builder.verifier(verifier.clone());
    }
    ProxyDeployer::new(builder.build().unwrap()).unwrap()
}

fn localhost() -> Network {
    Network::new("localhost", DEV_CHAIN_ID)
}

#[tokio::test]
async fn upgradeable_contract_is_deployed_behind_a_proxy() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);

    let deployment = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();
    let implementation = MockChain::address_of_deployment(0);
    let proxy = MockChain::address_of_deployment(1);
    assert!(deployment.newly_deployed);
    assert_eq!(deployment.address, proxy);
    assert_eq!(deployment.implementation, Some(implementation));
    assert_eq!(deployment.version, Some(1));

    let deployments = chain.deployments();
    assert_eq!(deployments.len(), 2);
    assert_eq!(deployments[0].1, fixtures::bytecode(VAULT));
    let proxy_code = fixtures::bytecode(ERC1967_PROXY_CONTRACT);
    let args = deployments[1].1.strip_prefix(&proxy_code[..]).unwrap();
    assert_eq!(&args[12..32], implementation.as_slice());
    let initialize = fixtures::selector("function initialize(address)");
    assert!(args.windows(4).any(|window| window == initialize.as_slice()));

    let ledger = deployer.ledger().unwrap();
    assert_eq!(ledger.contract(VAULT), Some(proxy));
    assert_eq!(ledger.implementation(VAULT), Some((1, implementation)));
    assert!(dir.path().join("localhost.oz-proxy.deployment.json").exists());
}

#[tokio::test]
#[traced_test]
async fn recorded_contract_is_not_redeployed() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);
    let first = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();

    let second = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();
    assert!(!second.newly_deployed);
    assert_eq!(second.address, first.address);
    assert_eq!(second.version, Some(1));
    assert_eq!(chain.deploy_count(), 2);
    assert!(logs_contain("already deployed"));
}

#[tokio::test]
async fn recorded_versions_block_redeployment() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("localhost.oz-proxy.deployment.json"),
        serde_json::json!({
            "contracts": {},
            "v1": { "Vault": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512" }
        })
        .to_string(),
    )
    .unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);

    let err = deployer.deploy(VAULT, Vec::new(), DEFAULT_INITIALIZER).await.unwrap_err();
    assert!(err.is_precondition_violation());
    assert!(err.to_string().contains("[v1]"));
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn upgrade_points_the_proxy_at_a_new_implementation() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);
    let deployment = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();

    let call = UpgradeCall {
        function: "initializeV2".to_string(),
        args: vec![DynSolValue::Uint(U256::from(25), 256)],
    };
    let upgrade = deployer.upgrade(VAULT, Some(call)).await.unwrap();
    let implementation = MockChain::address_of_deployment(2);
    assert_eq!(upgrade.proxy, deployment.address);
    assert_eq!(upgrade.implementation, implementation);
    assert_eq!(upgrade.version, 2);
    assert_eq!(chain.implementation_of(deployment.address), Some(implementation));

    let transactions = chain.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].to, deployment.address);
    let decoded = upgradeToAndCallCall::abi_decode(&transactions[0].input).unwrap();
    assert_eq!(decoded.newImplementation, implementation);
    assert_eq!(&decoded.data[..4], fixtures::selector("function initializeV2(uint256)").as_slice());

    let ledger = deployer.ledger().unwrap();
    assert_eq!(ledger.versions_of(VAULT), vec![1, 2]);
    assert_eq!(ledger.implementation(VAULT), Some((2, implementation)));
}

#[tokio::test]
async fn upgrade_requires_a_recorded_proxy() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let err = deployer(&chain, localhost(), dir.path(), None)
        .upgrade(VAULT, None)
        .await
        .unwrap_err();
    assert!(err.is_precondition_violation());

    let err = deployer(&chain, Network::new("hardhat", DEV_CHAIN_ID), dir.path(), None)
        .upgrade(VAULT, None)
        .await
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(chain.sent_count(), 0);
}

#[tokio::test]
async fn reverted_upgrade_records_nothing() {
    let dir = TempDir::new().unwrap();
    let chain = chain();
    deployer(&chain, localhost(), dir.path(), None)
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();

    let reverting = Arc::new(
        MockChain::new()
            .with_proxy_bytecode(fixtures::bytecode(ERC1967_PROXY_CONTRACT))
            .reverting_calls(),
    );
    let deployer = deployer(&reverting, localhost(), dir.path(), None);
    let err = deployer.upgrade(VAULT, None).await.unwrap_err();
    assert!(matches!(err, DeployError::ChainSubmission(_)));
    assert_eq!(deployer.ledger().unwrap().versions_of(VAULT), vec![1]);
}

#[tokio::test]
async fn plain_contract_is_deployed_with_constructor_args() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);

    let deployment = deployer
        .deploy(LOCK, vec![DynSolValue::Uint(U256::from(100), 256)], DEFAULT_INITIALIZER)
        .await
        .unwrap();
    assert_eq!(deployment.implementation, None);
    assert_eq!(deployment.version, None);

    let deployments = chain.deployments();
    assert_eq!(deployments.len(), 1);
    let code = fixtures::bytecode(LOCK);
    assert_eq!(deployments[0].1.len(), code.len() + 32);
    assert_eq!(deployments[0].1[code.len() + 31], 100);

    let ledger: OzLedger = deployer.ledger().unwrap();
    assert_eq!(ledger.contract(LOCK), Some(deployment.address));
    assert!(ledger.versions_of(LOCK).is_empty());

    let err = deployer.upgrade(LOCK, None).await.unwrap_err();
    assert!(err.to_string().contains("not upgradeable"));
}

#[tokio::test]
async fn live_network_verifies_implementation_and_proxy() {
    let chain = chain();
    let verifier = Arc::new(MockVerifier::new().failing_for(ERC1967_PROXY_CONTRACT));
    let dir = TempDir::new().unwrap();
    let network = Network::new("sepolia", NamedChain::Sepolia as u64);
    let deployer = deployer(&chain, network, dir.path(), Some(&verifier));

    let deployment = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();
    assert_eq!(
        verifier.requests(),
        vec![
            (MockChain::address_of_deployment(0), VAULT.to_string()),
            (MockChain::address_of_deployment(1), ERC1967_PROXY_CONTRACT.to_string()),
        ]
    );
    assert!(deployment.verifications[0].is_verified());
    assert!(!deployment.verifications[1].is_verified());

    let upgrade = deployer.upgrade(VAULT, None).await.unwrap();
    assert_eq!(verifier.requests().len(), 3);
    assert_eq!(upgrade.verifications.len(), 1);
    assert!(chain.requested_confirmations().iter().all(|c| *c == 6));
}

#[tokio::test]
async fn ephemeral_network_keeps_no_ledger() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, Network::new("hardhat", DEV_CHAIN_ID), dir.path(), None);

    let deployment = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], DEFAULT_INITIALIZER)
        .await
        .unwrap();
    assert_eq!(deployment.implementation, Some(MockChain::address_of_deployment(0)));
    assert_eq!(deployment.version, None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn initializer_arguments_need_an_initializer() {
    let chain = chain();
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&chain, localhost(), dir.path(), None);

    let err = deployer
        .deploy(VAULT, vec![DynSolValue::Address(OWNER)], "setup")
        .await
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(chain.sent_count(), 0);
}
