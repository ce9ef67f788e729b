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

//! Fixture contracts for the deployer tests.

use alloy::{
    json_abi::{Constructor, Event, Function, JsonAbi},
    primitives::{Bytes, Selector},
};
use diamond_deploy::{contracts::ERC1967_PROXY_CONTRACT, ArtifactRegistry, ContractArtifact};

pub const DIAMOND: &str = "Diamond";
pub const OWNERSHIP_FACET: &str = "OwnershipFacet";
pub const PAUSABLE_FACET: &str = "PausableFacet";
pub const ERC20_FACET: &str = "ERC20Facet";
/// Upgradeable contract deployed behind an ERC-1967 proxy.
pub const VAULT: &str = "Vault";
/// Plain contract with a constructor argument.
pub const LOCK: &str = "Lock";

/// Creation bytecode of a fixture contract. Unique per name, so deployments can be told apart.
pub fn bytecode(name: &str) -> Bytes {
    let mut code = vec![0x60, 0x80, 0x60, 0x40];
    code.extend_from_slice(name.as_bytes());
    code.into()
}

/// Build a JSON ABI from human-readable signatures.
pub fn abi(constructor: Option<&str>, functions: &[&str], events: &[&str]) -> JsonAbi {
    let mut abi = JsonAbi::new();
    abi.constructor = constructor.map(|signature| Constructor::parse(signature).unwrap());
    for signature in functions {
        let function = Function::parse(signature).unwrap();
        abi.functions.entry(function.name.clone()).or_default().push(function);
    }
    for signature in events {
        let event = Event::parse(signature).unwrap();
        abi.events.entry(event.name.clone()).or_default().push(event);
    }
    abi
}

/// Selector of a function given by its signature.
pub fn selector(signature: &str) -> Selector {
    Function::parse(signature).unwrap().selector()
}

fn artifact(name: &str, abi: JsonAbi) -> ContractArtifact {
    ContractArtifact::new(name, abi, bytecode(name))
}

/// Registry holding a diamond proxy, three facets and the ERC-1967 fixtures.
pub fn registry() -> ArtifactRegistry {
    let mut registry = ArtifactRegistry::new();
    registry
        .insert(artifact(
            DIAMOND,
            abi(None, &["function initialize(address owner)", "function facets() view returns (address[])"], &[]),
        ))
        .insert(artifact(
            OWNERSHIP_FACET,
            abi(
                None,
                &["function owner() view returns (address)", "function transferOwnership(address account)"],
                &["event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)"],
            ),
        ))
        .insert(artifact(
            PAUSABLE_FACET,
            abi(None, &["function pause()", "function unpause()", "function paused() view returns (bool)"], &[]),
        ))
        .insert(artifact(
            ERC20_FACET,
            abi(
                None,
                &[
                    "function transfer(address to, uint256 amount) returns (bool)",
                    "function balanceOf(address account) view returns (uint256)",
                ],
                &[],
            ),
        ))
        .insert(artifact(
            ERC1967_PROXY_CONTRACT,
            abi(Some("constructor(address implementation, bytes data)"), &[], &["event Upgraded(address indexed implementation)"]),
        ))
        .insert(artifact(
            VAULT,
            abi(
                None,
                &[
                    "function initialize(address owner)",
                    "function initializeV2(uint256 fee)",
                    "function upgradeToAndCall(address newImplementation, bytes data) payable",
                ],
                &["event Initialized(uint64 version)"],
            ),
        ))
        .insert(artifact(LOCK, abi(Some("constructor(uint256 unlockTime)"), &["function withdraw()"], &[])));
    registry
}
