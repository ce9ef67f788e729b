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

//! JSON file persistence for deployment ledgers.

use std::{
    io::{ErrorKind, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use atomicwrites::{AtomicFile, OverwriteBehavior};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::DeployError;

/// A JSON document of type `T` stored at a fixed path.
///
/// Every [ConfigStore::write] replaces the whole file. Callers that need to update part of the
/// document read it, modify it and write it back.
#[derive(Clone, Debug)]
pub struct ConfigStore<T> {
    path: PathBuf,
    _document: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> ConfigStore<T> {
    /// Create a store for the file at `path`. The parent directory must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let path = path.into();
        let parent = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => return Err(DeployError::config(&path, "path has no parent directory")),
        };
        if !parent.is_dir() {
            return Err(DeployError::config(&path, "directory of the given path does not exist"));
        }
        Ok(Self { path, _document: PhantomData })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_name(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Read the document. Returns `Ok(None)` when the file does not exist yet.
    pub fn read(&self) -> Result<Option<T>, DeployError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!("Config file [{}] not found; starting empty", self.file_name());
                return Ok(None);
            }
            Err(err) => return Err(DeployError::config(&self.path, err)),
        };
        let document = serde_json::from_slice(&data)
            .map_err(|err| DeployError::config(&self.path, format!("malformed JSON: {err}")))?;
        tracing::debug!("Config file [{}] read", self.file_name());
        Ok(Some(document))
    }

    /// Overwrite the file with the given document.
    pub fn write(&self, content: &T) -> Result<(), DeployError> {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        content
            .serialize(&mut serializer)
            .map_err(|err| DeployError::config(&self.path, format!("failed to serialize: {err}")))?;

        // Use AtomicFile to reduce the chance of corruption.
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&buffer))
            .map_err(|err| DeployError::config(&self.path, err))?;

        tracing::debug!("Config file [{}] updated", self.file_name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn missing_directory_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigStore::<BTreeMap<String, u64>>::new(dir.path().join("nope/ledger.json"))
            .unwrap_err();
        assert!(matches!(err, DeployError::Config { .. }));
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::<BTreeMap<String, u64>>::new(dir.path().join("a.json")).unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("a.json")).unwrap();
        let doc = BTreeMap::from([("one".to_string(), 1u64), ("two".to_string(), 2u64)]);
        store.write(&doc).unwrap();
        assert_eq!(store.read().unwrap(), Some(doc));

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n    \"one\": 1"), "expected 4-space indent: {text}");
    }

    #[test]
    fn write_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("a.json")).unwrap();
        store.write(&BTreeMap::from([("old".to_string(), 1u64)])).unwrap();
        store.write(&BTreeMap::from([("new".to_string(), 2u64)])).unwrap();
        let doc = store.read().unwrap().unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["new"]);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::<BTreeMap<String, u64>>::new(path).unwrap();
        assert!(matches!(store.read(), Err(DeployError::Config { .. })));
    }
}
