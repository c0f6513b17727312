//! Compiled contract artifacts.
//!
//! Artifacts are the JSON files a Hardhat compilation writes, either flat
//! (`<dir>/<Name>.json`) or in Hardhat's source layout
//! (`<dir>/contracts/<Name>.sol/<Name>.json`).

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub abi: Value,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

/// Looks up artifacts by contract name under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> [PathBuf; 2] {
        [
            self.root.join(format!("{name}.json")),
            self.root
                .join("contracts")
                .join(format!("{name}.sol"))
                .join(format!("{name}.json")),
        ]
    }

    /// Load the artifact compiled for contract `name`.
    pub fn load(&self, name: &str) -> Result<ContractArtifact> {
        let path = self
            .candidates(name)
            .into_iter()
            .find(|path| path.is_file())
            .with_context(|| {
                format!(
                    "No artifact for contract {} under {}",
                    name,
                    self.root.display()
                )
            })?;

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact: ContractArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no creation bytecode (abstract contract or interface?)",
                path.display()
            );
        }

        tracing::debug!(contract = name, path = %path.display(), "Loaded artifact");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_flat_layout() {
        let dir = TempDir::new("pocdeploy-artifacts").unwrap();
        write(
            &dir.path().join("POC.json"),
            r#"{"contractName":"POC","abi":[],"bytecode":"0x6080604052"}"#,
        );

        let artifact = ArtifactStore::new(dir.path()).load("POC").unwrap();
        assert_eq!(artifact.contract_name, "POC");
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_load_hardhat_layout() {
        let dir = TempDir::new("pocdeploy-artifacts").unwrap();
        write(
            &dir.path().join("contracts/POCAuction.sol/POCAuction.json"),
            r#"{"contractName":"POCAuction","abi":[{"type":"constructor"}],"bytecode":"0x60806040"}"#,
        );

        let artifact = ArtifactStore::new(dir.path()).load("POCAuction").unwrap();
        assert_eq!(artifact.contract_name, "POCAuction");
        assert!(artifact.abi.is_array());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new("pocdeploy-artifacts").unwrap();
        let err = ArtifactStore::new(dir.path()).load("POC").unwrap_err();
        assert!(err.to_string().contains("No artifact for contract POC"));
    }

    #[test]
    fn test_empty_bytecode_is_rejected() {
        let dir = TempDir::new("pocdeploy-artifacts").unwrap();
        write(
            &dir.path().join("IPOC.json"),
            r#"{"contractName":"IPOC","abi":[],"bytecode":"0x"}"#,
        );

        assert!(ArtifactStore::new(dir.path()).load("IPOC").is_err());
    }
}
