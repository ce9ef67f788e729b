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

//! Registry of compiled contracts, indexed by contract name.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    hex,
    json_abi::{Function, JsonAbi, Param},
    primitives::{Bytes, Selector},
};
use serde::Deserialize;

use crate::DeployError;

/// Name of the event emitted by OpenZeppelin's `Initializable`. Contracts declaring it are
/// deployed behind an ERC-1967 proxy.
const INITIALIZED_EVENT: &str = "Initialized";

/// ABI and creation bytecode of a compiled contract.
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: JsonAbi,
    /// Creation bytecode. Empty for interfaces and abstract contracts.
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: impl Into<Bytes>) -> Self {
        Self { name: name.into(), abi, bytecode: bytecode.into() }
    }

    /// Selectors of every function in the ABI.
    pub fn function_selectors(&self) -> Vec<Selector> {
        self.abi.functions().map(Function::selector).collect()
    }

    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }

    pub fn is_upgradeable(&self) -> bool {
        self.abi.events.contains_key(INITIALIZED_EVENT)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.abi.functions.contains_key(name)
    }

    fn function(&self, name: &str, arity: usize) -> Result<&Function, DeployError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| {
                DeployError::precondition(format!(
                    "Contract [{}] has no function [{name}] taking {arity} argument(s)",
                    self.name
                ))
            })
    }

    /// ABI-encode a call to `function` with the given arguments, including the selector.
    pub fn encode_call(&self, function: &str, args: &[DynSolValue]) -> Result<Bytes, DeployError> {
        let function = self.function(function, args.len())?;
        function.abi_encode_input(args).map(Bytes::from).map_err(|err| {
            DeployError::precondition(format!(
                "Invalid arguments for [{}.{}]: {err}",
                self.name, function.name
            ))
        })
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn init_code(&self, args: &[DynSolValue]) -> Result<Bytes, DeployError> {
        if !self.is_deployable() {
            return Err(DeployError::precondition(format!(
                "Contract [{}] has no creation bytecode",
                self.name
            )));
        }
        let encoded_args = match &self.abi.constructor {
            Some(constructor) => constructor.abi_encode_input(args).map_err(|err| {
                DeployError::precondition(format!(
                    "Invalid constructor arguments for [{}]: {err}",
                    self.name
                ))
            })?,
            None if args.is_empty() => Vec::new(),
            None => {
                return Err(DeployError::precondition(format!(
                    "Contract [{}] has no constructor but {} argument(s) were given",
                    self.name,
                    args.len()
                )))
            }
        };
        let mut init_code = self.bytecode.to_vec();
        init_code.extend(encoded_args);
        Ok(init_code.into())
    }

    /// Parse string arguments for `function` using the parameter types from the ABI.
    pub fn parse_call_args(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<DynSolValue>, DeployError> {
        let function = self.function(function, args.len())?;
        coerce_args(&self.name, &function.inputs, args)
    }

    /// Parse string constructor arguments using the parameter types from the ABI.
    pub fn parse_constructor_args(&self, args: &[String]) -> Result<Vec<DynSolValue>, DeployError> {
        let inputs = self.abi.constructor.as_ref().map(|c| c.inputs.as_slice()).unwrap_or_default();
        if inputs.len() != args.len() {
            return Err(DeployError::precondition(format!(
                "Constructor of [{}] takes {} argument(s), {} given",
                self.name,
                inputs.len(),
                args.len()
            )));
        }
        coerce_args(&self.name, inputs, args)
    }
}

fn coerce_args(
    contract: &str,
    params: &[Param],
    args: &[String],
) -> Result<Vec<DynSolValue>, DeployError> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            param.resolve().and_then(|ty| ty.coerce_str(arg)).map_err(|err| {
                DeployError::precondition(format!(
                    "Could not parse argument [{arg}] as {param} for [{contract}]: {err}"
                ))
            })
        })
        .collect()
}

/// Artifact JSON as written by forge (`bytecode.object`) or hardhat (`bytecode`).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    abi: JsonAbi,
    #[serde(default)]
    bytecode: Option<BytecodeField>,
    #[serde(default)]
    contract_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Object { object: String },
    Hex(String),
}

impl BytecodeField {
    fn as_str(&self) -> &str {
        match self {
            Self::Object { object } => object,
            Self::Hex(hex) => hex,
        }
    }
}

/// Contract artifacts indexed by contract name.
#[derive(Clone, Debug, Default)]
pub struct ArtifactRegistry {
    artifacts: HashMap<String, ContractArtifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, replacing any artifact with the same name.
    pub fn insert(&mut self, artifact: ContractArtifact) -> &mut Self {
        self.artifacts.insert(artifact.name.clone(), artifact);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ContractArtifact> {
        self.artifacts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Look up an artifact or return an error naming the missing contract.
    pub fn require(&self, name: &str) -> Result<&ContractArtifact, DeployError> {
        self.get(name).ok_or_else(|| {
            DeployError::precondition(format!("No artifact found for contract [{name}]"))
        })
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Load every artifact found under `dir`, e.g. forge's `out/` or hardhat's `artifacts/`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, DeployError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DeployError::config(dir, "artifacts directory does not exist"));
        }

        let mut files = Vec::new();
        collect_json_files(dir, &mut files).map_err(|err| DeployError::config(dir, err))?;
        files.sort();

        let mut registry = Self::new();
        for path in files {
            let Some(artifact) = read_artifact(&path) else {
                continue;
            };
            if registry.contains(&artifact.name) {
                tracing::warn!(
                    "Duplicate artifact for contract [{}] at {}; keeping the first one",
                    artifact.name,
                    path.display()
                );
                continue;
            }
            registry.insert(artifact);
        }
        tracing::debug!("Loaded {} contract artifacts from {}", registry.len(), dir.display());
        Ok(registry)
    }
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == "build-info") {
                continue;
            }
            collect_json_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json")
            && !path.to_string_lossy().ends_with(".dbg.json")
        {
            files.push(path);
        }
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Option<ContractArtifact> {
    let data = std::fs::read(path).ok()?;
    let file: ArtifactFile = match serde_json::from_slice(&data) {
        Ok(file) => file,
        Err(err) => {
            tracing::trace!("Skipping {}: not a contract artifact ({err})", path.display());
            return None;
        }
    };
    let name = file
        .contract_name
        .or_else(|| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))?;
    let bytecode = match file.bytecode.as_ref().map(|field| hex::decode(field.as_str())) {
        Some(Ok(bytecode)) => bytecode,
        Some(Err(err)) => {
            // Unlinked library placeholders are not valid hex.
            tracing::warn!("Contract [{name}] has undeployable bytecode: {err}");
            Vec::new()
        }
        None => Vec::new(),
    };
    Some(ContractArtifact::new(name, file.abi, bytecode))
}

#[cfg(test)]
mod tests {
    use alloy::{
        json_abi::Event,
        primitives::{address, fixed_bytes, U256},
    };

    use super::*;

    fn abi(functions: &[&str], events: &[&str]) -> JsonAbi {
        let mut abi = JsonAbi::new();
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

    #[test]
    fn selectors_cover_every_function() {
        let artifact = ContractArtifact::new(
            "OwnershipFacet",
            abi(&["function owner() view returns (address)", "function transferOwnership(address)"], &[]),
            vec![0x60, 0x80],
        );
        let mut selectors = artifact.function_selectors();
        selectors.sort();
        assert_eq!(selectors, vec![fixed_bytes!("0x8da5cb5b"), fixed_bytes!("0xf2fde38b")]);
    }

    #[test]
    fn upgradeable_contracts_declare_initialized() {
        let plain = ContractArtifact::new("Lock", abi(&["function withdraw()"], &[]), vec![0x60]);
        let upgradeable = ContractArtifact::new(
            "Vault",
            abi(&["function initialize(address)"], &["event Initialized(uint64 version)"]),
            vec![0x60],
        );
        assert!(!plain.is_upgradeable());
        assert!(upgradeable.is_upgradeable());
    }

    #[test]
    fn encode_call_includes_selector() {
        let artifact = ContractArtifact::new(
            "Diamond",
            abi(&["function initialize(address owner, uint256 fee)"], &[]),
            vec![0x60],
        );
        let args = artifact
            .parse_call_args(
                "initialize",
                &["0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(), "25".to_string()],
            )
            .unwrap();
        assert_eq!(args[0], DynSolValue::Address(address!("0x5FbDB2315678afecb367f032d93F642f64180aa3")));
        assert_eq!(args[1], DynSolValue::Uint(U256::from(25), 256));

        let calldata = artifact.encode_call("initialize", &args).unwrap();
        assert_eq!(calldata.len(), 4 + 64);
        assert_eq!(
            &calldata[..4],
            Function::parse("function initialize(address,uint256)").unwrap().selector().as_slice()
        );
    }

    #[test]
    fn missing_function_is_a_precondition_violation() {
        let artifact = ContractArtifact::new("Diamond", JsonAbi::new(), vec![0x60]);
        let err = artifact.encode_call("initialize", &[]).unwrap_err();
        assert!(err.is_precondition_violation());
    }

    #[test]
    fn init_code_appends_constructor_args() {
        let mut contract_abi = JsonAbi::new();
        contract_abi.constructor = Some(alloy::json_abi::Constructor::parse("constructor(uint256)").unwrap());
        let artifact = ContractArtifact::new("Lock", contract_abi, vec![0x60, 0x80]);
        let args = artifact.parse_constructor_args(&["7".to_string()]).unwrap();
        let init_code = artifact.init_code(&args).unwrap();
        assert_eq!(init_code.len(), 2 + 32);
        assert_eq!(init_code[33], 7);

        assert!(artifact.parse_constructor_args(&[]).is_err());
        let empty = ContractArtifact::new("IFacet", JsonAbi::new(), Bytes::new());
        assert!(empty.init_code(&[]).is_err());
    }

    #[test]
    fn loads_forge_and_hardhat_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let forge_dir = dir.path().join("out/OwnershipFacet.sol");
        std::fs::create_dir_all(&forge_dir).unwrap();
        std::fs::write(
            forge_dir.join("OwnershipFacet.json"),
            serde_json::json!({
                "abi": [{
                    "type": "function",
                    "name": "owner",
                    "inputs": [],
                    "outputs": [{"name": "", "type": "address", "internalType": "address"}],
                    "stateMutability": "view"
                }],
                "bytecode": {"object": "0x6080", "linkReferences": {}}
            })
            .to_string(),
        )
        .unwrap();

        let hardhat_dir = dir.path().join("out/contracts/Lock.sol");
        std::fs::create_dir_all(&hardhat_dir).unwrap();
        std::fs::write(
            hardhat_dir.join("Lock.json"),
            serde_json::json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "Lock",
                "abi": [],
                "bytecode": "0x60806040"
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(hardhat_dir.join("Lock.dbg.json"), "{\"buildInfo\": \"x\"}").unwrap();

        let build_info = dir.path().join("out/build-info");
        std::fs::create_dir_all(&build_info).unwrap();
        std::fs::write(build_info.join("abc.json"), "{\"id\": \"abc\"}").unwrap();

        let registry = ArtifactRegistry::load_dir(dir.path().join("out")).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.require("OwnershipFacet").unwrap().bytecode.as_ref(), &[0x60, 0x80]);
        assert_eq!(registry.require("Lock").unwrap().bytecode.len(), 4);
        assert!(registry.require("Missing").unwrap_err().is_precondition_violation());
    }

    #[test]
    fn missing_artifacts_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactRegistry::load_dir(dir.path().join("out")).unwrap_err();
        assert!(matches!(err, DeployError::Config { .. }));
    }
}
