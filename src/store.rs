use std::collections::HashMap;
use std::sync::Mutex;

use crate::codec;
use crate::error::{MaquetteError, MaquetteResult};
use crate::model::{Artifact, ArtifactRecord};

/// In-memory registry of every produced artifact, keyed by id. Lifecycle is
/// process start to process stop; there is no deletion API. Lookups clone
/// the artifact out, so reads never observe later inserts mid-copy and the
/// stored pixels are never handed out by reference.
#[derive(Default)]
pub struct DesignStore {
    inner: Mutex<HashMap<String, Artifact>>,
}

impl DesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact and return its id.
    pub fn insert(&self, artifact: Artifact) -> String {
        let id = artifact.id.clone();
        self.inner
            .lock()
            .expect("design store mutex poisoned")
            .insert(id.clone(), artifact);
        id
    }

    /// Fetch a copy of the artifact. Unknown ids are the one error category
    /// that crosses the service boundary.
    pub fn get(&self, id: &str) -> MaquetteResult<Artifact> {
        self.inner
            .lock()
            .expect("design store mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| MaquetteError::not_found(format!("design '{id}'")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .lock()
            .expect("design store mutex poisoned")
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("design store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable caller-facing view of a stored design.
    pub fn record(&self, id: &str) -> MaquetteResult<ArtifactRecord> {
        self.get(id)?.record()
    }

    /// Encoded PNG bytes for download.
    pub fn export_png(&self, id: &str) -> MaquetteResult<Vec<u8>> {
        let artifact = self.get(id)?;
        codec::encode_png(&artifact.image)
    }
}
