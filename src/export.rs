//! Export types for serializing knowledgebase state.
//!
//! A [`KbSnapshot`] is a read-only, name-resolved copy of every registry and
//! scope, suitable for JSON output. There is no import path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraint::TypeConstraint;
use crate::entity::EntityMeta;
use crate::graph::Triple;
use crate::inverse::InversePair;

/// Full copy of a knowledgebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbSnapshot {
    /// Registered entities, sorted by name.
    pub entities: Vec<EntityMeta>,
    /// Declared inverse pairs; `inverse` is the storage name.
    pub inverses: Vec<InversePair>,
    /// Relation name → constraint pairs, in registration order.
    pub constraints: BTreeMap<String, Vec<TypeConstraint>>,
    /// Global scope: relation name → ordered triples.
    pub global: BTreeMap<String, Vec<Triple>>,
    /// Entity name → that entity's non-empty private scope.
    pub beliefs: BTreeMap<String, BTreeMap<String, Vec<Triple>>>,
}

impl KbSnapshot {
    /// Total stored triples across the global and every local scope.
    pub fn triple_count(&self) -> usize {
        let count = |scope: &BTreeMap<String, Vec<Triple>>| scope.values().map(Vec::len).sum::<usize>();
        count(&self.global) + self.beliefs.values().map(count).sum::<usize>()
    }
}
