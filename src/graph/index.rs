//! Single-scope relation storage.
//!
//! Triples are grouped by relation name and kept in insertion order. A
//! position index on `(subject, target)` makes a repeated write an in-place
//! certainty update instead of an append.

use std::collections::{BTreeMap, HashMap};

use super::{Certainty, RelationQuery, Triple};

/// What an [`RelationGraph::upsert`] did to the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new triple was appended.
    Inserted,
    /// An existing `(subject, target)` pair had its certainty replaced.
    Updated { previous: Certainty },
}

/// Triples stored under one relation name.
#[derive(Debug, Clone, Default)]
struct RelationEntries {
    /// Insertion-ordered triples.
    triples: Vec<Triple>,
    /// `(subject, target)` → position in `triples`.
    positions: HashMap<(String, String), usize>,
}

/// One scope's storage of relationship triples, keyed by relation name.
///
/// Knows nothing about entities, types, or inverse relations. Invariant: for
/// a given relation name there is at most one triple per `(subject, target)`.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    relations: BTreeMap<String, RelationEntries>,
    triple_count: usize,
}

impl RelationGraph {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a triple under `relation`.
    ///
    /// An existing triple for the same `(subject, target)` keeps its position
    /// and takes the new certainty; otherwise the triple is appended.
    pub fn upsert(&mut self, relation: &str, triple: Triple) -> Upsert {
        let entries = self.relations.entry(relation.to_string()).or_default();
        let key = (triple.subject.clone(), triple.target.clone());

        if let Some(&pos) = entries.positions.get(&key) {
            let slot = &mut entries.triples[pos];
            let previous = slot.certainty;
            slot.certainty = triple.certainty;
            return Upsert::Updated { previous };
        }

        entries.positions.insert(key, entries.triples.len());
        entries.triples.push(triple);
        self.triple_count += 1;
        Upsert::Inserted
    }

    /// Every triple under the query's relation that passes its filters,
    /// in insertion order. Unknown relations yield an empty result.
    pub fn query(&self, query: &RelationQuery) -> Vec<Triple> {
        self.relations
            .get(&query.relation)
            .map(|entries| {
                entries
                    .triples
                    .iter()
                    .filter(|t| query.matches(t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any stored triple passes the query's filters.
    pub fn contains(&self, query: &RelationQuery) -> bool {
        self.relations
            .get(&query.relation)
            .is_some_and(|entries| entries.triples.iter().any(|t| query.matches(t)))
    }

    /// The stored certainty for an exact `(subject, relation, target)`.
    pub fn certainty_of(&self, subject: &str, relation: &str, target: &str) -> Option<Certainty> {
        let entries = self.relations.get(relation)?;
        let &pos = entries
            .positions
            .get(&(subject.to_string(), target.to_string()))?;
        Some(entries.triples[pos].certainty)
    }

    /// A copy of the whole scope: relation name → ordered triples.
    pub fn to_map(&self) -> BTreeMap<String, Vec<Triple>> {
        self.relations
            .iter()
            .map(|(name, entries)| (name.clone(), entries.triples.clone()))
            .collect()
    }

    /// Number of distinct relation names.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Number of stored triples across all relations.
    pub fn triple_count(&self) -> usize {
        self.triple_count
    }

    /// Whether the scope holds no triples.
    pub fn is_empty(&self) -> bool {
        self.triple_count == 0
    }
}
