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


//! Cut manifests read by `diamond upgrade`.

use std::path::Path;

use alloy::{
    json_abi::Function,
    primitives::{Address, Selector},
};
use anyhow::{bail, Context};
use diamond_deploy::{CutSpec, FacetCutAction};
use serde::Deserialize;

/// A batch of facet cuts, as written by the operator.
///
/// ```yaml
/// cuts:
///   - facetName: PausableFacet
///     action: ADD
///   - facetName: OwnershipFacet
///     action: REMOVE
///     selectors: ["transferOwnership(address)", "0x8da5cb5b"]
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutManifest {
    pub cuts: Vec<ManifestCut>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestCut {
    pub facet_name: String,
    pub action: FacetCutAction,
    #[serde(default)]
    pub facet_address: Option<Address>,
    /// Each entry is either a 4-byte hex selector or a function signature.
    #[serde(default)]
    pub selectors: Option<Vec<String>>,
}

impl CutManifest {
    /// Read a manifest from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cut manifest {}", path.display()))?;
        let yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let manifest = if yaml {
            serde_yaml::from_str(&contents).context("Failed to parse YAML cut manifest")?
        } else {
            serde_json::from_str(&contents).context("Failed to parse JSON cut manifest")?
        };
        Ok(manifest)
    }

    pub fn into_cuts(self) -> anyhow::Result<Vec<CutSpec>> {
        self.cuts.into_iter().map(ManifestCut::into_cut).collect()
    }
}

impl ManifestCut {
    fn into_cut(self) -> anyhow::Result<CutSpec> {
        let mut cut = CutSpec::new(self.facet_name, self.action);
        if let Some(address) = self.facet_address {
            cut = cut.with_address(address);
        }
        if let Some(selectors) = self.selectors {
            let selectors = selectors
                .iter()
                .map(|selector| parse_selector(selector))
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("Invalid selectors for facet [{}]", cut.facet_name))?;
            cut = cut.with_selectors(selectors);
        }
        Ok(cut)
    }
}

/// Parse a `0x`-prefixed 4-byte selector, or hash a function signature into one.
pub fn parse_selector(input: &str) -> anyhow::Result<Selector> {
    let input = input.trim();
    if input.starts_with("0x") {
        if input.len() != 10 {
            bail!("selector {input} is not 4 bytes long");
        }
        return input.parse().with_context(|| format!("selector {input} is not valid hex"));
    }
    let function = Function::parse(input)
        .with_context(|| format!("{input} is neither a selector nor a function signature"))?;
    Ok(function.selector())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, fixed_bytes};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn selectors_parse_from_hex_and_signatures() {
        assert_eq!(parse_selector("0xa9059cbb").unwrap(), fixed_bytes!("a9059cbb"));
        assert_eq!(
            parse_selector("transfer(address,uint256)").unwrap(),
            fixed_bytes!("a9059cbb")
        );
        assert_eq!(
            parse_selector("function transfer(address to, uint256 amount)").unwrap(),
            fixed_bytes!("a9059cbb")
        );
        parse_selector("0xa9059c").unwrap_err();
        parse_selector("0xzz059cbb").unwrap_err();
        parse_selector("not a function").unwrap_err();
    }

    #[test]
    fn json_manifest_becomes_cut_specs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cuts.json");
        std::fs::write(
            &path,
            r#"{
                "cuts": [
                    { "facetName": "PausableFacet", "action": "ADD" },
                    {
                        "facetName": "OwnershipFacet",
                        "action": "REPLACE",
                        "facetAddress": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                        "selectors": ["owner()"]
                    }
                ]
            }"#,
        )
        .unwrap();

        let cuts = CutManifest::load(&path).unwrap().into_cuts().unwrap();
        assert_eq!(cuts[0], CutSpec::new("PausableFacet", FacetCutAction::Add));
        assert_eq!(
            cuts[1],
            CutSpec::new("OwnershipFacet", FacetCutAction::Replace)
                .with_address(address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"))
                .with_selectors(vec![fixed_bytes!("8da5cb5b")])
        );
    }

    #[test]
    fn yaml_manifest_is_detected_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cuts.yaml");
        std::fs::write(
            &path,
            "cuts:\n  - facetName: OwnershipFacet\n    action: REMOVE\n    selectors: [\"0x8da5cb5b\"]\n",
        )
        .unwrap();

        let cuts = CutManifest::load(&path).unwrap().into_cuts().unwrap();
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].action, FacetCutAction::Remove);
        assert_eq!(cuts[0].facet_address, None);
        assert_eq!(cuts[0].selectors, Some(vec![fixed_bytes!("8da5cb5b")]));
    }

    #[test]
    fn bad_selector_names_the_facet() {
        let manifest = CutManifest {
            cuts: vec![ManifestCut {
                facet_name: "PausableFacet".into(),
                action: FacetCutAction::Add,
                facet_address: None,
                selectors: Some(vec!["0x1234".into()]),
            }],
        };
        let err = manifest.into_cuts().unwrap_err();
        assert!(err.to_string().contains("[PausableFacet]"));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = serde_json::from_str::<CutManifest>(
            r#"{ "cuts": [{ "facetName": "PausableFacet", "action": "UPSERT" }] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("UPSERT"));
    }
}
