// Copyright 2026 BadCompany
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

//! Resource table owned by the server.
//!
//! Descriptors are registered by the hosting application and read
//! concurrently by connection tasks. Lookups hand out clones; the live map
//! never leaves the lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::ResourceRegistry;
use crate::core::errors::ResourceError;
use crate::protocol::types::ResourceDescriptor;

/// Fetches the raw bytes behind a uri.
pub trait ResourceReader: Send + Sync {
    fn read(&self, uri: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Treats the uri as a filesystem path (a `file://` prefix is stripped).
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResourceReader;

impl FileResourceReader {
    pub fn path_for(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

impl ResourceReader for FileResourceReader {
    fn read(&self, uri: &str) -> Result<Vec<u8>, ResourceError> {
        let path = Self::path_for(uri);
        debug!("Reading resource from {}", path.display());
        Ok(std::fs::read(path)?)
    }
}

/// Mime types whose content is served as text by `resources/read`.
pub fn is_text_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/")
        || matches!(
            essence.as_str(),
            "application/json" | "application/xml" | "application/javascript" | "application/toml"
        )
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
}

pub struct ResourceTable {
    entries: RwLock<HashMap<String, ResourceDescriptor>>,
    reader: Arc<dyn ResourceReader>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::with_reader(Arc::new(FileResourceReader))
    }

    pub fn with_reader(reader: Arc<dyn ResourceReader>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            reader,
        }
    }

    /// Insert or replace the descriptor for `uri`.
    pub fn register(
        &self,
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) {
        let descriptor = ResourceDescriptor {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
            metadata,
        };
        debug!("Registering resource {}", descriptor.uri);
        self.write().insert(descriptor.uri.clone(), descriptor);
    }

    pub fn remove(&self, uri: &str) -> Option<ResourceDescriptor> {
        self.write().remove(uri)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panicking writer cannot leave a half-inserted descriptor behind, so a
    // poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ResourceDescriptor>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ResourceDescriptor>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTable")
            .field("entries", &self.len())
            .finish()
    }
}

impl ResourceRegistry for ResourceTable {
    fn list(&self) -> Vec<ResourceDescriptor> {
        self.read().values().cloned().collect()
    }

    fn get(&self, uri: &str) -> Option<ResourceDescriptor> {
        self.read().get(uri).cloned()
    }

    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, ResourceError> {
        if self.get(uri).is_none() {
            return Err(ResourceError::NotFound(uri.to_string()));
        }
        self.reader.read(uri)
    }
}
