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

//! Checks run on a cut batch before anything is written to the chain.

use alloy::primitives::{Address, Selector};
use futures_util::future::join_all;

use super::CutSpec;
use crate::{
    chain::ChainClient, ledger::DiamondLedger, ledger::FacetCutAction, registry::ArtifactRegistry,
    DeployError,
};

/// Selectors a cut applies to: the explicit list, or every function of the facet's artifact.
pub(crate) fn cut_selectors(cut: &CutSpec, registry: &ArtifactRegistry) -> Option<Vec<Selector>> {
    match &cut.selectors {
        Some(selectors) => Some(selectors.clone()),
        None => registry.get(&cut.facet_name).map(|artifact| artifact.function_selectors()),
    }
}

/// Rule violations that can be found without reading the chain.
pub(crate) fn static_violations(
    ledger: &DiamondLedger,
    proxy_name: &str,
    cuts: &[CutSpec],
    registry: &ArtifactRegistry,
) -> Vec<String> {
    if cuts.is_empty() {
        return vec![format!("No facet cuts given for diamond proxy [{proxy_name}]")];
    }

    let mut violations = Vec::new();
    for cut in cuts {
        let name = &cut.facet_name;
        let action = cut.action;
        match &cut.selectors {
            Some(selectors) if selectors.is_empty() => {
                violations.push(format!("{action} cut for facet [{name}] has no selectors"))
            }
            None if !registry.contains(name) => violations.push(format!(
                "{action} cut for facet [{name}] gives no selectors and no artifact is known to derive them"
            )),
            None if cut_selectors(cut, registry).is_some_and(|s| s.is_empty()) => violations
                .push(format!("{action} cut for facet [{name}] has no selectors in its ABI")),
            _ => {}
        }

        match (action.requires_target(), cut.facet_address) {
            (true, Some(Address::ZERO)) => {
                violations.push(format!("{action} cut for facet [{name}] targets the zero address"))
            }
            (false, Some(address)) if !address.is_zero() => violations.push(format!(
                "{action} cut for facet [{name}] must target the zero address, got [{address}]"
            )),
            _ => {}
        }

        if action == FacetCutAction::Replace {
            if let Some(address) = cut.facet_address {
                let selectors = cut_selectors(cut, registry);
                if ledger.has_recorded_facet(proxy_name, address, selectors.as_deref()) {
                    violations.push(format!(
                        "REPLACE cut for facet [{name}] reuses [{address}], which already serves these selectors"
                    ));
                }
            }
        }
    }
    violations
}

/// Rule violations that need chain reads: every explicit ADD/REPLACE facet must hold code.
pub(crate) async fn code_violations(chain: &dyn ChainClient, cuts: &[CutSpec]) -> Vec<String> {
    let checks = cuts
        .iter()
        .filter(|cut| cut.action.requires_target())
        .filter_map(|cut| cut.facet_address.filter(|address| !address.is_zero()).map(|a| (cut, a)))
        .map(|(cut, address)| async move {
            match chain.code_at(address).await {
                Ok(code) if code.is_empty() => Some(format!(
                    "{} cut for facet [{}] targets [{address}], which has no code",
                    cut.action, cut.facet_name
                )),
                Ok(_) => None,
                Err(err) => Some(format!(
                    "Could not read code of facet [{}] at [{address}]: {err:#}",
                    cut.facet_name
                )),
            }
        });
    join_all(checks).await.into_iter().flatten().collect()
}

/// Run every check and fold all violations into a single error.
pub(crate) async fn validate_batch(
    chain: &dyn ChainClient,
    ledger: &DiamondLedger,
    proxy_name: &str,
    cuts: &[CutSpec],
    registry: &ArtifactRegistry,
) -> Result<(), DeployError> {
    let mut violations = static_violations(ledger, proxy_name, cuts, registry);
    if !cuts.is_empty() {
        violations.extend(code_violations(chain, cuts).await);
    }
    if violations.is_empty() {
        return Ok(());
    }
    for violation in &violations {
        tracing::error!("{violation}");
    }
    Err(DeployError::precondition(format!(
        "Invalid cut batch for diamond proxy [{proxy_name}]: {}",
        violations.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use alloy::{
        json_abi::{Function, JsonAbi},
        primitives::{address, b256, fixed_bytes},
    };

    use super::*;
    use crate::{
        ledger::{CutRecord, CutStatus},
        registry::ContractArtifact,
    };

    const FACET: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

    fn registry() -> ArtifactRegistry {
        let mut abi = JsonAbi::new();
        let owner = Function::parse("function owner() view returns (address)").unwrap();
        abi.functions.insert(owner.name.clone(), vec![owner]);
        let mut registry = ArtifactRegistry::new();
        registry.insert(ContractArtifact::new("OwnershipFacet", abi, vec![0x60, 0x80]));
        registry.insert(ContractArtifact::new("EmptyFacet", JsonAbi::new(), vec![0x60, 0x80]));
        registry
    }

    fn cut(action: FacetCutAction, address: Option<Address>, selectors: Option<Vec<Selector>>) -> CutSpec {
        CutSpec {
            facet_name: "OwnershipFacet".to_string(),
            facet_address: address,
            selectors,
            action,
        }
    }

    fn check(cuts: &[CutSpec]) -> Vec<String> {
        static_violations(&DiamondLedger::default(), "Diamond", cuts, &registry())
    }

    #[test]
    fn empty_batch() {
        assert_eq!(check(&[]).len(), 1);
    }

    #[test]
    fn zero_address_policy() {
        let selectors = Some(vec![fixed_bytes!("0x8da5cb5b")]);
        assert_eq!(check(&[cut(FacetCutAction::Remove, Some(FACET), selectors.clone())]).len(), 1);
        assert_eq!(check(&[cut(FacetCutAction::Add, Some(Address::ZERO), selectors.clone())]).len(), 1);
        assert_eq!(
            check(&[cut(FacetCutAction::Replace, Some(Address::ZERO), selectors.clone())]).len(),
            1
        );
        assert!(check(&[cut(FacetCutAction::Remove, Some(Address::ZERO), selectors.clone())]).is_empty());
        assert!(check(&[cut(FacetCutAction::Remove, None, None)]).is_empty());
        assert!(check(&[cut(FacetCutAction::Add, Some(FACET), selectors)]).is_empty());
    }

    #[test]
    fn selector_rules() {
        assert_eq!(check(&[cut(FacetCutAction::Add, None, Some(Vec::new()))]).len(), 1);

        let mut unknown = cut(FacetCutAction::Add, Some(FACET), None);
        unknown.facet_name = "ForeignFacet".to_string();
        assert_eq!(check(&[unknown.clone()]).len(), 1);
        unknown.selectors = Some(vec![fixed_bytes!("0x01ffc9a7")]);
        assert!(check(&[unknown]).is_empty());

        let mut empty_abi = cut(FacetCutAction::Add, None, None);
        empty_abi.facet_name = "EmptyFacet".to_string();
        assert_eq!(check(&[empty_abi]).len(), 1);
    }

    #[test]
    fn every_violation_is_reported() {
        let violations = check(&[
            cut(FacetCutAction::Remove, Some(FACET), Some(Vec::new())),
            cut(FacetCutAction::Add, Some(Address::ZERO), None),
        ]);
        assert_eq!(violations.len(), 3, "{violations:?}");
    }

    #[test]
    fn replace_may_not_reuse_recorded_facet() {
        let mut ledger = DiamondLedger::default();
        ledger
            .insert_proxy(
                "Diamond",
                address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
                b256!("0x8d3bc1a9ff4a0a6e03e96ef05b0e3d2d4f2a2c5d1ddfbb6e29bd4c2d2d3f1a10"),
            )
            .unwrap();
        ledger
            .append_batch(
                "Diamond",
                [CutRecord::new(
                    "OwnershipFacet",
                    FACET,
                    vec![fixed_bytes!("0x8da5cb5b")],
                    FacetCutAction::Add,
                    CutStatus::Succeeded,
                )],
            )
            .unwrap();

        let replace = cut(FacetCutAction::Replace, Some(FACET), None);
        let violations = static_violations(&ledger, "Diamond", &[replace], &registry());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("REPLACE"));

        let other_selectors =
            cut(FacetCutAction::Replace, Some(FACET), Some(vec![fixed_bytes!("0x01ffc9a7")]));
        assert!(static_violations(&ledger, "Diamond", &[other_selectors], &registry()).is_empty());
    }
}
