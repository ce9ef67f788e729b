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

//! Smart contract interfaces used by the deployers.

use alloy::{
    primitives::{b256, Address, Bytes, Selector, B256},
    sol_types::SolCall,
};

use crate::ledger::FacetCutAction;

alloy::sol! {
    #[sol(all_derives)]
    interface IDiamondWritable {
        struct FacetCut {
            address target;
            uint8 action;
            bytes4[] selectors;
        }

        error DiamondWritable__InvalidInitializationParameters();
        error DiamondWritable__RemoveTargetNotZeroAddress();
        error DiamondWritable__ReplaceTargetIsIdentical();
        error DiamondWritable__SelectorAlreadyAdded();
        error DiamondWritable__SelectorIsImmutable();
        error DiamondWritable__SelectorNotFound();
        error DiamondWritable__SelectorNotSpecified();
        error DiamondWritable__TargetHasNoCode();

        event DiamondCut(FacetCut[] facetCuts, address target, bytes data);

        function diamondCut(FacetCut[] calldata facetCuts, address target, bytes calldata data) external;
    }
}

alloy::sol! {
    #[sol(all_derives)]
    interface IUUPSUpgradeable {
        function upgradeToAndCall(address newImplementation, bytes memory data) external payable;
    }
}

/// Storage slot holding the implementation address of an ERC-1967 proxy,
/// `keccak256("eip1967.proxy.implementation") - 1`.
pub const ERC1967_IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Name of the proxy contract artifact used for OpenZeppelin-style deployments.
pub const ERC1967_PROXY_CONTRACT: &str = "ERC1967Proxy";

impl IDiamondWritable::FacetCut {
    pub fn new(target: Address, action: FacetCutAction, selectors: Vec<Selector>) -> Self {
        Self { target, action: action as u8, selectors }
    }
}

/// Calldata for a `diamondCut` transaction. `initializer` is the contract to delegate-call
/// after the cut together with its calldata.
pub fn diamond_cut_calldata(
    cuts: Vec<IDiamondWritable::FacetCut>,
    initializer: Option<(Address, Bytes)>,
) -> Bytes {
    let (target, data) = initializer.unwrap_or_default();
    IDiamondWritable::diamondCutCall { facetCuts: cuts, target, data }.abi_encode().into()
}

/// Calldata for a UUPS `upgradeToAndCall` transaction.
pub fn upgrade_to_and_call_calldata(new_implementation: Address, data: Bytes) -> Bytes {
    IUUPSUpgradeable::upgradeToAndCallCall { newImplementation: new_implementation, data }
        .abi_encode()
        .into()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, fixed_bytes};

    use super::*;

    #[test]
    fn diamond_cut_calldata_decodes() {
        let facet = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
        let proxy = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        let calldata = diamond_cut_calldata(
            vec![IDiamondWritable::FacetCut::new(
                facet,
                FacetCutAction::Replace,
                vec![fixed_bytes!("0x8da5cb5b")],
            )],
            Some((proxy, Bytes::from_static(&[0xaa]))),
        );
        let decoded = IDiamondWritable::diamondCutCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.facetCuts.len(), 1);
        assert_eq!(decoded.facetCuts[0].target, facet);
        assert_eq!(decoded.facetCuts[0].action, 1);
        assert_eq!(decoded.target, proxy);
        assert_eq!(decoded.data.as_ref(), &[0xaa]);
    }

    #[test]
    fn no_initializer_targets_zero_address() {
        let calldata = diamond_cut_calldata(Vec::new(), None);
        let decoded = IDiamondWritable::diamondCutCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.target, Address::ZERO);
        assert!(decoded.data.is_empty());
    }
}
