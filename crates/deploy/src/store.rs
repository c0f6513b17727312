//! Per-network deployment record store.
//!
//! Records live under `<root>/<network>/`, one pretty-printed JSON file per
//! contract name, next to a `.chainId` file naming the chain they were
//! deployed to. A store opened for writing holds an exclusive lock on
//! `<network>/.lock`; read-only stores hold a shared one.

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use anyhow::Context;
use fs2::FileExt;

use crate::{
    error::{DeployError, DeployResult},
    fs::FsHandler,
    record::DeployedContract,
};

const CHAIN_ID_FILENAME: &str = ".chainId";
const LOCK_FILENAME: &str = ".lock";

/// How a persisted store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAccess {
    /// Single writer, used by the sequencer.
    ReadWrite,
    /// Shared reader, used by inspection.
    ReadOnly,
}

/// Mapping from contract name to its deployed identity on one network.
#[derive(Debug)]
pub struct DeploymentRecordStore {
    network: String,
    dir: Option<PathBuf>,
    access: StoreAccess,
    records: BTreeMap<String, DeployedContract>,
    _lock: Option<File>,
}

impl DeploymentRecordStore {
    /// A store that lives only in memory.
    pub fn ephemeral(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            dir: None,
            access: StoreAccess::ReadWrite,
            records: BTreeMap::new(),
            _lock: None,
        }
    }

    /// Open the persisted store of `network` under `root`.
    ///
    /// Fails with [`DeployError::ChainMismatch`] if the directory was written for
    /// a different chain, and with [`DeployError::StoreLocked`] if another run
    /// holds a conflicting lock. A read-only store of a network that was never
    /// deployed to is empty.
    pub fn open(
        root: &Path,
        network: &str,
        chain_id: u64,
        access: StoreAccess,
    ) -> DeployResult<Self> {
        let dir = root.join(network);

        if access == StoreAccess::ReadOnly && !dir.is_dir() {
            tracing::debug!(network, dir = %dir.display(), "No deployments recorded yet");
            return Ok(Self {
                network: network.to_string(),
                dir: Some(dir),
                access,
                records: BTreeMap::new(),
                _lock: None,
            });
        }

        FsHandler::ensure_dir(&dir).map_err(|e| DeployError::store(&dir, e))?;
        let lock = Self::lock(&dir, access)?;
        Self::check_chain_id(&dir, network, chain_id, access)?;

        let mut records = BTreeMap::new();
        for path in FsHandler::json_files(&dir).map_err(|e| DeployError::store(&dir, e))? {
            let record = Self::read_record(&path)?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| record.name.clone());
            records.insert(name, record);
        }

        tracing::debug!(
            network,
            dir = %dir.display(),
            records = records.len(),
            ?access,
            "Opened deployment record store"
        );

        Ok(Self {
            network: network.to_string(),
            dir: Some(dir),
            access,
            records,
            _lock: Some(lock),
        })
    }

    fn lock(dir: &Path, access: StoreAccess) -> DeployResult<File> {
        let path = dir.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))
            .map_err(|e| DeployError::store(dir, e))?;

        let locked = match access {
            StoreAccess::ReadWrite => FileExt::try_lock_exclusive(&file),
            StoreAccess::ReadOnly => FileExt::try_lock_shared(&file),
        };

        match locked {
            Ok(()) => Ok(file),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(DeployError::StoreLocked { path })
            }
            Err(e) => Err(DeployError::store(
                dir,
                anyhow::Error::new(e).context("Failed to lock record store"),
            )),
        }
    }

    fn check_chain_id(
        dir: &Path,
        network: &str,
        chain_id: u64,
        access: StoreAccess,
    ) -> DeployResult<()> {
        let path = dir.join(CHAIN_ID_FILENAME);

        if !path.exists() {
            if access == StoreAccess::ReadWrite {
                std::fs::write(&path, chain_id.to_string())
                    .with_context(|| format!("Failed to write {}", path.display()))
                    .map_err(|e| DeployError::store(dir, e))?;
            }
            return Ok(());
        }

        let recorded = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| {
                content
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid chain id in {}", path.display()))
            })
            .map_err(|e| DeployError::store(dir, e))?;

        if recorded != chain_id {
            return Err(DeployError::ChainMismatch {
                network: network.to_string(),
                expected: recorded,
                actual: chain_id,
            });
        }

        Ok(())
    }

    fn read_record(path: &Path) -> DeployResult<DeployedContract> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| {
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse deployment record {}", path.display()))
            })
            .map_err(|e| DeployError::store(path, e))
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// The directory holding this network's records, if persisted.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn get(&self, name: &str) -> DeployResult<&DeployedContract> {
        self.records.get(name).ok_or_else(|| DeployError::NotFound {
            name: name.to_string(),
            network: self.network.clone(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Snapshot of every record on this network.
    pub fn all(&self) -> BTreeMap<String, DeployedContract> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn writable_dir(&self) -> DeployResult<Option<&Path>> {
        match (self.access, self.dir.as_deref()) {
            (StoreAccess::ReadOnly, dir) => Err(DeployError::store(
                dir.unwrap_or(Path::new(&self.network)),
                anyhow::anyhow!("Record store was opened read-only"),
            )),
            (StoreAccess::ReadWrite, dir) => Ok(dir),
        }
    }

    /// Store `record` under `name`, replacing any previous record.
    pub fn put(&mut self, name: &str, record: DeployedContract) -> DeployResult<()> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(DeployError::store(
                Path::new(&self.network),
                anyhow::anyhow!("Invalid contract name for a deployment record: {:?}", name),
            ));
        }

        if let Some(dir) = self.writable_dir()? {
            let path = dir.join(format!("{name}.json"));
            let json = serde_json::to_vec_pretty(&record)
                .context("Failed to serialize deployment record")
                .map_err(|e| DeployError::store(&path, e))?;
            FsHandler::write_atomic(&path, &json).map_err(|e| DeployError::store(&path, e))?;
            tracing::debug!(contract = name, path = %path.display(), "Deployment record saved");
        }

        self.records.insert(name.to_string(), record);
        Ok(())
    }

    /// Drop every record of this network.
    pub fn clear(&mut self) -> DeployResult<()> {
        if let Some(dir) = self.writable_dir()? {
            for path in FsHandler::json_files(dir).map_err(|e| DeployError::store(dir, e))? {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))
                    .map_err(|e| DeployError::store(&path, e))?;
            }
        }

        tracing::info!(network = %self.network, removed = self.records.len(), "Cleared deployment records");
        self.records.clear();
        Ok(())
    }
}
