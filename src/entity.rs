//! Entity registry: name → entity record.
//!
//! Entities are the only addressable nodes. Each record carries an optional
//! type tag (used by constraint checks) and the entity's private belief scope,
//! created fresh whenever the name is registered.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EntityError;
use crate::graph::RelationGraph;

/// Label used in diagnostics for an entity without a type tag.
pub const UNTYPED: &str = "untyped";

/// Immutable identity of a registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Unique name; the only key used anywhere.
    pub name: String,
    /// Optional type tag, compared by plain string equality.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl EntityMeta {
    /// An entity without a type tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    /// Set the type tag.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// The type tag, or [`UNTYPED`].
    pub fn kind_label(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNTYPED)
    }
}

impl std::fmt::Display for EntityMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{} [{kind}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone)]
struct EntityRecord {
    meta: EntityMeta,
    /// Private facts written through this entity.
    beliefs: RelationGraph,
}

/// Name → entity record map.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, EntityRecord>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity with a fresh, empty belief scope.
    ///
    /// Re-registering a name replaces the old record and discards its beliefs,
    /// returning the replaced metadata, unless `strict` is set, in which case
    /// the call fails with [`EntityError::Duplicate`] and nothing changes.
    pub fn register(&mut self, meta: EntityMeta, strict: bool) -> Result<Option<EntityMeta>, EntityError> {
        if strict && self.entities.contains_key(&meta.name) {
            return Err(EntityError::Duplicate { name: meta.name });
        }
        let record = EntityRecord {
            meta: meta.clone(),
            beliefs: RelationGraph::new(),
        };
        Ok(self.entities.insert(meta.name, record).map(|old| old.meta))
    }

    /// Look up an entity by name.
    pub fn lookup(&self, name: &str) -> Result<&EntityMeta, EntityError> {
        self.record(name).map(|r| &r.meta)
    }

    /// The entity's private belief scope.
    pub fn beliefs(&self, name: &str) -> Result<&RelationGraph, EntityError> {
        self.record(name).map(|r| &r.beliefs)
    }

    /// Mutable access to the entity's private belief scope.
    pub fn beliefs_mut(&mut self, name: &str) -> Result<&mut RelationGraph, EntityError> {
        self.entities
            .get_mut(name)
            .map(|r| &mut r.beliefs)
            .ok_or_else(|| EntityError::NotFound { name: name.into() })
    }

    /// Every entity with its belief scope, in no particular order.
    pub fn scopes(&self) -> impl Iterator<Item = (&EntityMeta, &RelationGraph)> {
        self.entities.values().map(|r| (&r.meta, &r.beliefs))
    }

    /// All registered entities, sorted by name.
    pub fn all(&self) -> Vec<EntityMeta> {
        let mut all: Vec<EntityMeta> = self.entities.values().map(|r| r.meta.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of registered entities.
    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }

    fn record(&self, name: &str) -> Result<&EntityRecord, EntityError> {
        self.entities
            .get(name)
            .ok_or_else(|| EntityError::NotFound { name: name.into() })
    }
}
