//! The local state file recording what `apply` manages, keyed by resource address.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::ResourceState;
use crate::error::{Error, Result};

const STATE_VERSION: u32 = 1;

fn state_version() -> u32 {
    STATE_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(flatten)]
    pub state: ResourceState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default = "state_version")]
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Read the state file, a missing file is an empty state
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::StateFile {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| Error::StateDecode {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write the state next to its destination first, then move it into place
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let io_error = |source| Error::StateFile {
            path: path.display().to_string(),
            source,
        };

        let json = serde_json::to_string_pretty(self).map_err(|source| Error::StateDecode {
            path: path.display().to_string(),
            source,
        })?;

        let staging = path.with_extension("tmp");
        std::fs::write(&staging, json).map_err(io_error)?;
        std::fs::rename(&staging, path).map_err(io_error)
    }

    pub fn get(&self, address: &str) -> Option<&StateEntry> {
        self.resources.get(address)
    }

    pub fn insert(&mut self, address: impl Into<String>, resource_type: impl Into<String>, state: ResourceState) {
        self.resources.insert(
            address.into(),
            StateEntry {
                resource_type: resource_type.into(),
                state,
            },
        );
    }

    pub fn remove(&mut self, address: &str) -> Option<StateEntry> {
        self.resources.remove(address)
    }

    /// Addresses recorded in state but absent from `addresses`
    pub fn orphans<'a>(&'a self, addresses: &[String]) -> Vec<&'a str> {
        self.resources
            .keys()
            .filter(|address| !addresses.contains(*address))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn group(name: &str) -> ResourceState {
        ResourceState {
            id: format!("/subscriptions/s/resourceGroups/{name}"),
            attributes: json!({"name": name}).as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(dir.path().join("azurerm.state.json")).unwrap();
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn saved_state_loads_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azurerm.state.json");

        let mut state = StateFile::default();
        state.insert("azurerm_resource_group.a", "azurerm_resource_group", group("a"));
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn garbage_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azurerm.state.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(StateFile::load(&path), Err(Error::StateDecode { .. })));
    }

    #[test]
    fn orphans_are_entries_missing_from_the_manifest() {
        let mut state = StateFile::default();
        state.insert("azurerm_resource_group.a", "azurerm_resource_group", group("a"));
        state.insert("azurerm_resource_group.b", "azurerm_resource_group", group("b"));

        assert_eq!(
            state.orphans(&["azurerm_resource_group.a".to_string()]),
            vec!["azurerm_resource_group.b"]
        );
    }
}
