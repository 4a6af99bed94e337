//! Compiled contract artifacts.
//!
//! Compilation happens outside of stakeup. This module reads its output (Hardhat-style
//! artifact JSON files holding the ABI and creation bytecode) and uses the ABI to encode
//! constructor arguments and method calls.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::Deserialize;

/// A compiled contract: its ABI and creation bytecode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Parse a Hardhat artifact JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse contract artifact JSON")
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    pub fn encode_deployment(&self, args: &[String]) -> Result<Bytes> {
        if self.bytecode.is_empty() {
            anyhow::bail!(
                "Contract {} has no creation bytecode (is it abstract or an interface?)",
                self.contract_name
            );
        }

        let encoded_args = match self.abi.constructor() {
            Some(constructor) => {
                let values = coerce_args(&self.contract_name, "constructor", &constructor.inputs, args)?;
                constructor.abi_encode_input(&values).with_context(|| {
                    format!("Failed to encode constructor arguments of {}", self.contract_name)
                })?
            }
            None if args.is_empty() => Vec::new(),
            None => anyhow::bail!(
                "Contract {} has no constructor but {} argument(s) were given",
                self.contract_name,
                args.len()
            ),
        };

        let mut init_code = self.bytecode.to_vec();
        init_code.extend_from_slice(&encoded_args);
        Ok(init_code.into())
    }

    /// Selector followed by the ABI-encoded arguments of `method`.
    ///
    /// Overloads are disambiguated by argument count.
    pub fn encode_call(&self, method: &str, args: &[String]) -> Result<Bytes> {
        let overloads = self.abi.function(method).with_context(|| {
            format!(
                "Contract {} has no method named {}",
                self.contract_name, method
            )
        })?;

        let mut candidates = overloads.iter().filter(|f| f.inputs.len() == args.len());
        let function = match (candidates.next(), candidates.next()) {
            (Some(function), None) => function,
            (None, _) => anyhow::bail!(
                "Method {}.{} does not take {} argument(s)",
                self.contract_name,
                method,
                args.len()
            ),
            (Some(_), Some(_)) => anyhow::bail!(
                "Method {}.{} is ambiguous with {} argument(s); several overloads match",
                self.contract_name,
                method,
                args.len()
            ),
        };

        let values = coerce_args(&self.contract_name, method, &function.inputs, args)?;
        let calldata = function.abi_encode_input(&values).with_context(|| {
            format!("Failed to encode call to {}.{}", self.contract_name, method)
        })?;

        Ok(calldata.into())
    }
}

/// Coerce string arguments to the ABI parameter types.
fn coerce_args(
    contract: &str,
    what: &str,
    params: &[Param],
    args: &[String],
) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        anyhow::bail!(
            "{} {} expects {} argument(s), got {}",
            contract,
            what,
            params.len(),
            args.len()
        );
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .with_context(|| format!("Unsupported parameter type {}", param.ty))?;
            ty.coerce_str(arg).with_context(|| {
                format!(
                    "Argument {} of {} {} is not a valid {}: {}",
                    param.name, contract, what, param.ty, arg
                )
            })
        })
        .collect()
}

/// Provides compiled artifacts by contract type name.
pub trait ArtifactSource {
    fn artifact(&self, contract: &str) -> Result<Artifact>;
}

/// Artifacts stored in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifacts {
    artifacts: HashMap<String, Artifact>,
}

impl InMemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, artifact: Artifact) -> Self {
        self.insert(artifact);
        self
    }

    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts
            .insert(artifact.contract_name.clone(), artifact);
    }
}

impl ArtifactSource for InMemoryArtifacts {
    fn artifact(&self, contract: &str) -> Result<Artifact> {
        self.artifacts
            .get(contract)
            .cloned()
            .with_context(|| format!("No artifact for contract {}", contract))
    }
}

/// Artifacts laid out the way Hardhat writes them:
/// `<root>/contracts/<Source>.sol/<Contract>.json`.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every artifact file for `contract` below the root.
    fn find(&self, contract: &str) -> Result<Vec<PathBuf>> {
        let file_name = format!("{}.json", contract);
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read artifacts directory {}", dir.display()))?;

            for entry in entries {
                let path = entry
                    .with_context(|| format!("Failed to read entry in {}", dir.display()))?
                    .path();

                if path.is_dir() {
                    if path.file_name().is_some_and(|name| name == "build-info") {
                        continue;
                    }
                    pending.push(path);
                } else if path.file_name().is_some_and(|name| name == file_name.as_str()) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

impl ArtifactSource for HardhatArtifacts {
    fn artifact(&self, contract: &str) -> Result<Artifact> {
        if !self.root.exists() {
            anyhow::bail!(
                "Artifacts directory does not exist: {}. Compile the contracts first.",
                self.root.display()
            );
        }

        let path = match self.find(contract)?.as_slice() {
            [] => anyhow::bail!(
                "No artifact for contract {} under {}",
                contract,
                self.root.display()
            ),
            [path] => path.clone(),
            paths => anyhow::bail!(
                "Several artifacts match contract {}: {}. Use a unique contract name.",
                contract,
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact = Artifact::from_json(&content)
            .with_context(|| format!("Invalid artifact {}", path.display()))?;

        tracing::debug!(contract, path = %path.display(), "Loaded artifact");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    const TEST_TOKEN_ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "TestToken",
        "sourceName": "contracts/TestToken.sol",
        "abi": [
            {"type": "constructor", "inputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
             "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}],
             "outputs": [{"name": "", "type": "bool"}]}
        ],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080"
    }"#;

    const POOL_STAKE_ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "poolstake",
        "sourceName": "contracts/poolstake.sol",
        "abi": [
            {"type": "constructor", "stateMutability": "nonpayable",
             "inputs": [{"name": "_stakingToken", "type": "address"}, {"name": "_rewardToken", "type": "address"}]}
        ],
        "bytecode": "0x60806040",
        "deployedBytecode": "0x6080"
    }"#;

    #[test]
    fn test_encode_deployment_appends_constructor_args() {
        let artifact = Artifact::from_json(POOL_STAKE_ARTIFACT).unwrap();
        let token = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();

        let init_code = artifact
            .encode_deployment(&[token.clone(), token])
            .unwrap();

        // bytecode + two 32-byte words
        assert_eq!(init_code.len(), 4 + 64);
        assert_eq!(&init_code[..4], &[0x60, 0x80, 0x60, 0x40]);
        assert_eq!(
            hex::encode(&init_code[4 + 12..4 + 32]),
            "5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_encode_deployment_wrong_arity() {
        let artifact = Artifact::from_json(POOL_STAKE_ARTIFACT).unwrap();
        assert!(artifact.encode_deployment(&[]).is_err());
    }

    #[test]
    fn test_encode_transfer_call() {
        let artifact = Artifact::from_json(TEST_TOKEN_ARTIFACT).unwrap();

        let calldata = artifact
            .encode_call(
                "transfer",
                &[
                    "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
                    "10000000000000000000000".to_string(),
                ],
            )
            .unwrap();

        // transfer(address,uint256)
        assert_eq!(hex::encode(&calldata[..4]), "a9059cbb");
        assert_eq!(calldata.len(), 4 + 64);
        // 10_000 * 10^18 = 0x21e19e0c9bab2400000
        assert!(hex::encode(&calldata[36..]).ends_with("021e19e0c9bab2400000"));
    }

    #[test]
    fn test_encode_call_rejects_bad_values() {
        let artifact = Artifact::from_json(TEST_TOKEN_ARTIFACT).unwrap();

        assert!(artifact
            .encode_call("transfer", &["not-an-address".to_string(), "1".to_string()])
            .is_err());
        assert!(artifact.encode_call("approve", &[]).is_err());
        assert!(artifact.encode_call("transfer", &[]).is_err());
    }

    #[test]
    fn test_hardhat_layout_lookup() {
        let temp_dir = TempDir::new("stakeup-test").expect("Failed to create temp dir");
        let source_dir = temp_dir.path().join("contracts/TestToken.sol");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("TestToken.json"), TEST_TOKEN_ARTIFACT).unwrap();
        std::fs::write(source_dir.join("TestToken.dbg.json"), "{}").unwrap();
        std::fs::create_dir_all(temp_dir.path().join("build-info")).unwrap();

        let artifacts = HardhatArtifacts::new(temp_dir.path());
        let artifact = artifacts.artifact("TestToken").unwrap();
        assert_eq!(artifact.contract_name, "TestToken");

        assert!(artifacts.artifact("poolstake").is_err());
    }

    #[test]
    fn test_hardhat_missing_root() {
        let artifacts = HardhatArtifacts::new("/nonexistent/stakeup/artifacts");
        let err = artifacts.artifact("TestToken").unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }
}
