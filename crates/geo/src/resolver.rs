//! Projection parameter resolution.
//!
//! A CRS identifier is resolved by trying three tiers in order and taking
//! the first hit:
//!
//! 1. the [`DefinitionCache`] handed to the resolver,
//! 2. the static table of well-known definitions,
//! 3. an external [`DefinitionLookup`] (normally the epsg.io client).
//!
//! Whatever tier 2 or 3 produces is written to the cache under the exact
//! identifier requested. Lookup failures are logged and reported as
//! "not found"; nothing is retried.

use crate::definition::well_known;
use crate::{DefinitionCache, GeoError, ProjectionDefinition, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Source of projection definitions that are not known locally.
pub trait DefinitionLookup: Send + Sync {
    /// Fetch the raw definition text for an EPSG code.
    fn fetch(&self, code: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Lookup that never reaches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl DefinitionLookup for Offline {
    async fn fetch(&self, _code: &str) -> Result<String> {
        Err(GeoError::LookupDisabled)
    }
}

impl<L: DefinitionLookup> DefinitionLookup for Option<L> {
    async fn fetch(&self, code: &str) -> Result<String> {
        match self {
            Some(lookup) => lookup.fetch(code).await,
            None => Err(GeoError::LookupDisabled),
        }
    }
}

impl<L: DefinitionLookup> DefinitionLookup for Arc<L> {
    async fn fetch(&self, code: &str) -> Result<String> {
        self.as_ref().fetch(code).await
    }
}

/// Tier a definition was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Already in the cache
    Cache,
    /// Static table of well-known codes
    WellKnown,
    /// External definition service
    Lookup,
}

/// A resolved definition and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The definition
    pub definition: ProjectionDefinition,
    /// Tier that produced it
    pub source: ResolutionSource,
}

/// Resolves CRS identifiers to projection definitions.
#[derive(Debug)]
pub struct Resolver<L> {
    cache: Arc<DefinitionCache>,
    lookup: L,
}

impl Resolver<Offline> {
    /// Resolver with a fresh cache and no external lookup.
    pub fn offline() -> Self {
        Self::new(Offline)
    }
}

impl<L: DefinitionLookup> Resolver<L> {
    /// Create a resolver with a fresh cache.
    pub fn new(lookup: L) -> Self {
        Self::with_cache(Arc::new(DefinitionCache::new()), lookup)
    }

    /// Create a resolver over an existing cache.
    pub fn with_cache(cache: Arc<DefinitionCache>, lookup: L) -> Self {
        Self { cache, lookup }
    }

    /// The cache this resolver writes to.
    pub fn cache(&self) -> &Arc<DefinitionCache> {
        &self.cache
    }

    /// The external lookup used as the last tier.
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolve a CRS identifier, or `None` if no tier knows it.
    pub async fn resolve(&self, code: &str) -> Option<ProjectionDefinition> {
        self.resolve_with_source(code)
            .await
            .map(|resolution| resolution.definition)
    }

    /// Resolve a CRS identifier, failing with [`GeoError::ProjectionUnavailable`].
    pub async fn require(&self, code: &str) -> Result<ProjectionDefinition> {
        self.resolve(code)
            .await
            .ok_or_else(|| GeoError::ProjectionUnavailable(code.to_string()))
    }

    /// Resolve a CRS identifier and report the tier that answered.
    #[instrument(skip(self))]
    pub async fn resolve_with_source(&self, code: &str) -> Option<Resolution> {
        if code.trim().is_empty() {
            return None;
        }

        if let Some(definition) = self.cache.get(code) {
            trace!(code, "Definition cache hit");
            return Some(Resolution {
                definition,
                source: ResolutionSource::Cache,
            });
        }

        let resolution = match from_table(code) {
            Some(definition) => Resolution {
                definition,
                source: ResolutionSource::WellKnown,
            },
            None => Resolution {
                definition: self.from_lookup(code).await?,
                source: ResolutionSource::Lookup,
            },
        };

        debug!(code, source = ?resolution.source, "Resolved projection definition");
        self.cache.insert(code, resolution.definition.clone());
        Some(resolution)
    }

    async fn from_lookup(&self, code: &str) -> Option<ProjectionDefinition> {
        match self.lookup.fetch(code).await {
            Ok(text) if !text.trim().is_empty() => Some(ProjectionDefinition::new(text)),
            Ok(_) => {
                warn!(code, "Definition service returned an empty definition");
                None
            }
            Err(GeoError::LookupDisabled) => {
                debug!(code, "External lookup disabled");
                None
            }
            Err(e) => {
                warn!(code, error = %e, "Failed to fetch projection definition");
                None
            }
        }
    }
}

fn from_table(code: &str) -> Option<ProjectionDefinition> {
    well_known(code).map(ProjectionDefinition::new)
}
