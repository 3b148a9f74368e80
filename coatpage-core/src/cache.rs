use crate::classifier::EntityClassifier;
use crate::types::*;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;

/// Version constants stamped into run fingerprints
pub mod versions {
    pub const COATPAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Bumped whenever block or page layout rules change
    pub const LAYOUT_VERSION: &str = "1.0.0";
}

/// Per-run classification cache. A name is classified once, every later
/// lookup returns the same entity.
pub struct EntityCache {
    classifier: EntityClassifier,
    entries: RefCell<HashMap<String, Entity>>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            classifier: EntityClassifier::new(),
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn entity(&self, name: &str) -> Entity {
        if let Some(hit) = self.entries.borrow().get(name) {
            return hit.clone();
        }
        let entity = self.classifier.classify(name);
        self.entries
            .borrow_mut()
            .insert(name.to_string(), entity.clone());
        entity
    }

    pub fn category(&self, name: &str) -> Category {
        self.entity(name).category
    }

    pub fn classifier(&self) -> &EntityClassifier {
        &self.classifier
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Identifies a run by its inputs: same rows + same config = same fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RunFingerprint {
    pub source_hash: String,
    pub config_hash: String,
    pub coatpage_version: String,
    pub layout_version: String,
}

impl RunFingerprint {
    pub fn new(source_hash: String, config_hash: String) -> Self {
        Self {
            source_hash,
            config_hash,
            coatpage_version: versions::COATPAGE_VERSION.to_string(),
            layout_version: versions::LAYOUT_VERSION.to_string(),
        }
    }

    pub fn to_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.source_hash);
        hasher.update(&self.config_hash);
        hasher.update(&self.coatpage_version);
        hasher.update(&self.layout_version);
        format!("{:x}", hasher.finalize())
    }
}

/// SHA-256 over the JSON form of any serializable value.
pub fn calculate_json_hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| anyhow!("Failed to serialize value for hashing: {}", e))?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
