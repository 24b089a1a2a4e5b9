//! Per-entity belief views.
//!
//! An [`Entity`] reads and writes its own private scope and falls back to the
//! knowledgebase's global scope. Local facts come first in merged results, and
//! a local denial overrides any global affirmation in [`Entity::knows`].
//!
//! The belief algebra, for a given `(subject, relation, target)`:
//!
//! | query | holds when |
//! |---|---|
//! | `rejects` | the local scope stores certainty `0` |
//! | `certain` | the local scope stores certainty `1` |
//! | `knows` | not rejected, and certain or any merged match for certainty `1` |
//! | `suspects` | like `knows`, for certainty `-1` |
//! | `thinks` | `knows` or `suspects` |

use std::collections::BTreeMap;

use crate::engine::{Knowledgebase, Scope};
use crate::entity::EntityMeta;
use crate::error::KbResult;
use crate::graph::{Certainty, RelationQuery, Triple};

/// A registered entity seen through its own beliefs.
///
/// Borrowed from the owning [`Knowledgebase`]; obtain one with
/// [`Knowledgebase::entity`].
#[derive(Debug, Clone)]
pub struct Entity<'kb> {
    kb: &'kb Knowledgebase,
    meta: EntityMeta,
}

impl<'kb> Entity<'kb> {
    pub(crate) fn new(kb: &'kb Knowledgebase, meta: EntityMeta) -> Self {
        Self { kb, meta }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn kind(&self) -> Option<&str> {
        self.meta.kind.as_deref()
    }

    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    /// Record a private fact. Goes through the same entity checks, inverse
    /// normalization and constraint gate as a global write.
    pub fn assert(
        &self,
        subject: &str,
        relation: &str,
        target: &str,
        certainty: impl Into<Certainty>,
    ) -> KbResult<()> {
        self.kb
            .assert_relationship(subject, relation, target, certainty, Scope::Local(self.name()))
    }

    /// Local matches followed by global matches. Duplicates and contradictions
    /// between the two scopes are both kept.
    pub fn find_relationships(&self, query: &RelationQuery) -> Vec<Triple> {
        self.kb.find_merged(self.name(), query)
    }

    /// This entity's private facts: relation name → ordered triples.
    pub fn local_relations(&self) -> BTreeMap<String, Vec<Triple>> {
        self.kb.scope_relations(Scope::Local(self.name()))
    }

    /// Whether any merged fact links this entity to `target` by `relation`.
    ///
    /// No belief short-circuiting: a local denial does not hide a global
    /// affirmation here.
    pub fn has(&self, relation: &str, target: &str, certainty: Option<Certainty>) -> bool {
        let query = RelationQuery::new(relation)
            .subject(self.name())
            .target(target)
            .with_certainty(certainty);
        let found = self.kb.exists_merged(self.name(), &query);
        tracing::debug!(entity = self.name(), relation, target, found, "has");
        found
    }

    /// The local scope denies the fact.
    pub fn rejects(&self, subject: &str, relation: &str, target: &str) -> bool {
        self.holds_locally(subject, relation, target, Certainty::DENIED)
    }

    /// The local scope affirms the fact.
    pub fn certain(&self, subject: &str, relation: &str, target: &str) -> bool {
        self.holds_locally(subject, relation, target, Certainty::AFFIRMED)
    }

    /// Believes the fact is affirmed.
    pub fn knows(&self, subject: &str, relation: &str, target: &str) -> bool {
        self.knows_with(subject, relation, target, Certainty::AFFIRMED)
    }

    /// Believes the fact at the given certainty, unless locally denied.
    ///
    /// A local affirmation only short-circuits an affirmed query; it is not
    /// evidence for any other certainty.
    pub fn knows_with(
        &self,
        subject: &str,
        relation: &str,
        target: &str,
        certainty: impl Into<Certainty>,
    ) -> bool {
        let certainty = certainty.into();
        if self.rejects(subject, relation, target) {
            return false;
        }
        if certainty == Certainty::AFFIRMED && self.certain(subject, relation, target) {
            return true;
        }
        let query = fact(subject, relation, target).certainty(certainty);
        self.kb.exists_merged(self.name(), &query)
    }

    /// Suspects the fact without affirming it.
    pub fn suspects(&self, subject: &str, relation: &str, target: &str) -> bool {
        self.knows_with(subject, relation, target, Certainty::SUSPECTED)
    }

    /// Either knows or suspects the fact.
    pub fn thinks(&self, subject: &str, relation: &str, target: &str) -> bool {
        self.knows(subject, relation, target) || self.suspects(subject, relation, target)
    }

    fn holds_locally(&self, subject: &str, relation: &str, target: &str, certainty: Certainty) -> bool {
        self.kb
            .holds(Scope::Local(self.name()), subject, relation, target, certainty)
    }
}

fn fact(subject: &str, relation: &str, target: &str) -> RelationQuery {
    RelationQuery::new(relation).subject(subject).target(target)
}
