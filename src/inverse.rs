//! Inverse relation pairs: `P(X, Y) ↔ Q(Y, X)`.
//!
//! Declaring `(relation, inverse)` makes the two names interchangeable with
//! subject and target swapped. Each pair has one canonical storage name, the
//! `inverse` side, computed once at declaration time:
//!
//! - writes under `relation` are stored under `inverse` with subject/target swapped
//! - writes under `inverse` are stored as given
//!
//! Reads consult both names, so facts written before a declaration stay visible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A declared pair. `inverse` is the storage form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InversePair {
    pub relation: String,
    pub inverse: String,
}

/// The storage direction for a write under some relation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageForm<'a> {
    /// Relation name the triple is stored under.
    pub relation: &'a str,
    /// Whether subject and target trade places before storing.
    pub swap: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    partner: String,
    swap: bool,
}

/// Symmetric relation name ↔ inverse name map.
///
/// Invariant: `a → b` is present iff `b → a` is present. Re-declaring either
/// name drops its previous pairing in both directions.
#[derive(Debug, Clone, Default)]
pub struct InverseRegistry {
    entries: HashMap<String, Entry>,
}

impl InverseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `relation` and `inverse` as an inverse pair.
    ///
    /// Returns the older pairings this declaration displaced. Re-declaring an
    /// existing pair, in either order, changes nothing and keeps its storage
    /// name.
    pub fn declare(&mut self, relation: &str, inverse: &str) -> Vec<InversePair> {
        if self.inverse_of(relation) == Some(inverse) {
            return Vec::new();
        }

        let mut displaced = Vec::new();
        for name in [relation, inverse] {
            let Some(old) = self.entries.get(name) else {
                continue;
            };
            if old.partner == relation || old.partner == inverse {
                continue;
            }
            let partner = old.partner.clone();
            displaced.push(if old.swap {
                InversePair {
                    relation: name.to_string(),
                    inverse: partner.clone(),
                }
            } else {
                InversePair {
                    relation: partner.clone(),
                    inverse: name.to_string(),
                }
            });
            self.entries.remove(&partner);
        }

        self.entries.insert(
            relation.to_string(),
            Entry {
                partner: inverse.to_string(),
                swap: true,
            },
        );
        // Inserted last so a self-inverse relation stores as given.
        self.entries.insert(
            inverse.to_string(),
            Entry {
                partner: relation.to_string(),
                swap: false,
            },
        );
        displaced
    }

    /// The declared inverse of `relation`, if any.
    pub fn inverse_of(&self, relation: &str) -> Option<&str> {
        self.entries.get(relation).map(|e| e.partner.as_str())
    }

    /// Where a write under `relation` is stored.
    pub fn storage_form<'a>(&'a self, relation: &'a str) -> StorageForm<'a> {
        match self.entries.get(relation) {
            Some(entry) if entry.swap => StorageForm {
                relation: entry.partner.as_str(),
                swap: true,
            },
            _ => StorageForm {
                relation,
                swap: false,
            },
        }
    }

    /// Every declared pair once, sorted by relation name.
    pub fn pairs(&self) -> Vec<InversePair> {
        let mut pairs: Vec<InversePair> = self
            .entries
            .iter()
            .filter(|(name, e)| e.swap || e.partner == **name)
            .map(|(name, e)| InversePair {
                relation: name.clone(),
                inverse: e.partner.clone(),
            })
            .collect();
        pairs.sort_by(|a, b| a.relation.cmp(&b.relation));
        pairs
    }
}
