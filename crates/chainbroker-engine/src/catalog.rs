//! Contract descriptors and interface manifests the engine works against.
//!
//! Catalogs are handed to operations explicitly; there is no global
//! registry. `MemoryCatalog` implements both traits and loads manifests
//! from YAML or JSON files.

use chainbroker_abi::contract_from_abi_json;
use chainbroker_core::{BrokerError, ContractDescriptor, InterfaceManifest};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub trait ContractCatalog: Send + Sync {
    fn get_contract(&self, id: &str) -> Option<ContractDescriptor>;

    /// Inserts or replaces the descriptor with the same id.
    fn put_contract(&self, descriptor: ContractDescriptor) -> Result<(), BrokerError>;
}

pub trait InterfaceCatalog: Send + Sync {
    /// All manifests, ordered by id.
    fn list_interfaces(&self) -> Vec<InterfaceManifest>;

    fn get_interface(&self, id: &str) -> Option<InterfaceManifest>;
}

#[derive(Default)]
struct Inner {
    contracts: BTreeMap<String, ContractDescriptor>,
    interfaces: BTreeMap<String, InterfaceManifest>,
}

/// Thread-safe in-memory catalog.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<RwLock<Inner>>,
}

/// One manifest or a list of them per file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Many(Vec<InterfaceManifest>),
    One(InterfaceManifest),
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a manifest; ids are unique. Signatures are stored in
    /// canonical form.
    pub fn add_interface(&self, manifest: InterfaceManifest) -> Result<(), BrokerError> {
        self.add_interfaces(vec![manifest])
    }

    /// Registers a batch of manifests. Nothing is inserted unless every
    /// manifest is well formed and every id is new.
    pub fn add_interfaces(&self, manifests: Vec<InterfaceManifest>) -> Result<(), BrokerError> {
        let manifests = manifests
            .into_iter()
            .map(canonical_manifest)
            .collect::<Result<Vec<_>, _>>()?;
        let mut inner = self.write();
        let mut seen = BTreeSet::new();
        for manifest in &manifests {
            if inner.interfaces.contains_key(&manifest.id) || !seen.insert(manifest.id.as_str()) {
                return Err(BrokerError::AlreadyExists {
                    kind: "interface",
                    id: manifest.id.clone(),
                });
            }
        }
        for manifest in manifests {
            inner.interfaces.insert(manifest.id.clone(), manifest);
        }
        Ok(())
    }

    /// Parses manifests from YAML (or JSON) text. Returns how many were added.
    pub fn load_interfaces_str(&self, content: &str) -> Result<usize, BrokerError> {
        let manifests = parse_manifests(content)?;
        let count = manifests.len();
        self.add_interfaces(manifests)?;
        Ok(count)
    }

    pub fn load_interfaces_file(&self, path: &Path) -> Result<usize, BrokerError> {
        let manifests = read_manifests(path)?;
        let count = manifests.len();
        self.add_interfaces(manifests)?;
        Ok(count)
    }

    /// Loads every `.yaml`, `.yml` and `.json` manifest under `dir`, as one
    /// batch.
    pub fn load_interfaces_dir(&self, dir: &Path) -> Result<usize, BrokerError> {
        let mut manifests = Vec::new();
        for path in manifest_files(dir)? {
            manifests.extend(read_manifests(&path)?);
        }
        let count = manifests.len();
        self.add_interfaces(manifests)?;
        tracing::info!(dir = %dir.display(), count, "interface manifests loaded");
        Ok(count)
    }

    /// Loads a contract descriptor from an ABI JSON file and stores it.
    pub fn load_contract_abi(
        &self,
        id: &str,
        name: &str,
        path: &Path,
    ) -> Result<ContractDescriptor, BrokerError> {
        let content = std::fs::read_to_string(path).map_err(|e| BrokerError::Config {
            reason: format!("{}: {e}", path.display()),
        })?;
        let descriptor = contract_from_abi_json(id, name, &content)?;
        self.put_contract(descriptor.clone())?;
        Ok(descriptor)
    }

    pub fn interface_count(&self) -> usize {
        self.read().interfaces.len()
    }

    pub fn contract_ids(&self) -> Vec<String> {
        self.read().contracts.keys().cloned().collect()
    }
}

fn parse_manifests(content: &str) -> Result<Vec<InterfaceManifest>, BrokerError> {
    let parsed: ManifestFile = serde_yaml::from_str(content).map_err(|e| BrokerError::Config {
        reason: format!("invalid interface manifest: {e}"),
    })?;
    Ok(match parsed {
        ManifestFile::Many(list) => list,
        ManifestFile::One(m) => vec![m],
    })
}

fn read_manifests(path: &Path) -> Result<Vec<InterfaceManifest>, BrokerError> {
    let content = std::fs::read_to_string(path).map_err(|e| BrokerError::Config {
        reason: format!("{}: {e}", path.display()),
    })?;
    parse_manifests(&content).map_err(|e| BrokerError::Config {
        reason: format!("{}: {e}", path.display()),
    })
}

fn canonical_manifest(manifest: InterfaceManifest) -> Result<InterfaceManifest, BrokerError> {
    if manifest.id.trim().is_empty() {
        return Err(BrokerError::Config {
            reason: "interface manifest without an id".into(),
        });
    }
    let id = manifest.id.clone();
    manifest.canonicalized().map_err(|e| BrokerError::Config {
        reason: format!("interface '{id}': {e}"),
    })
}

fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>, BrokerError> {
    let io = |e: std::io::Error| BrokerError::Config {
        reason: format!("{}: {e}", dir.display()),
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            files.extend(manifest_files(&path)?);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        ) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl ContractCatalog for MemoryCatalog {
    fn get_contract(&self, id: &str) -> Option<ContractDescriptor> {
        self.read().contracts.get(id).cloned()
    }

    fn put_contract(&self, descriptor: ContractDescriptor) -> Result<(), BrokerError> {
        descriptor.validate()?;
        self.write()
            .contracts
            .insert(descriptor.id.clone(), descriptor);
        Ok(())
    }
}

impl InterfaceCatalog for MemoryCatalog {
    fn list_interfaces(&self) -> Vec<InterfaceManifest> {
        self.read().interfaces.values().cloned().collect()
    }

    fn get_interface(&self, id: &str) -> Option<InterfaceManifest> {
        self.read().interfaces.get(id).cloned()
    }
}
