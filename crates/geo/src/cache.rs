//! In-memory store of resolved projection definitions.
//!
//! Entries live for the lifetime of the store: there is no TTL and no
//! eviction, because a CRS identifier always resolves to the same
//! definition. Concurrent writers of the same key simply overwrite each
//! other with equal values.
//!
//! # Example
//!
//! ```
//! use bfgeo_geo::{DefinitionCache, ProjectionDefinition};
//!
//! let cache = DefinitionCache::new();
//! cache.insert("4326", ProjectionDefinition::wgs84());
//! assert_eq!(cache.get("4326"), Some(ProjectionDefinition::wgs84()));
//! ```

use crate::ProjectionDefinition;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Shared, read-mostly map from CRS identifier to definition.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: RwLock<HashMap<String, ProjectionDefinition>>,
}

impl DefinitionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-key lookup.
    pub fn get(&self, code: &str) -> Option<ProjectionDefinition> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    /// Store a definition under the exact identifier it was requested with.
    pub fn insert(&self, code: impl Into<String>, definition: ProjectionDefinition) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code.into(), definition);
    }

    /// Returns true if the identifier has been resolved before.
    pub fn contains(&self, code: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(code)
    }

    /// Number of cached definitions.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
