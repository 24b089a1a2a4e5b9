//! Knowledgebase facade: top-level API for the doxa relationship store.
//!
//! The [`Knowledgebase`] owns every registry and the global scope, and is the
//! single write path: entity resolution, inverse normalization and the
//! constraint gate all happen here, whichever scope a write targets.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::belief::Entity;
use crate::constraint::{ConstraintRegistry, TypeConstraint};
use crate::entity::{EntityMeta, EntityRegistry};
use crate::error::{KbResult, ScenarioError};
use crate::export::KbSnapshot;
use crate::graph::index::Upsert;
use crate::graph::{Certainty, RelationGraph, RelationQuery, Triple};
use crate::inverse::InverseRegistry;

/// Configuration for a knowledgebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Certainty used when a write does not supply one.
    pub default_certainty: Certainty,
    /// Reject re-registration of an existing entity name instead of replacing it.
    pub strict_registration: bool,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            default_certainty: Certainty::AFFIRMED,
            strict_registration: false,
        }
    }
}

impl KbConfig {
    /// Parse a TOML config. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> KbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_toml_str(&content).map_err(|e| ScenarioError::InvalidConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })?)
    }
}

/// Which relation graph a write or read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// The shared fact base.
    Global,
    /// The private scope of the named entity.
    Local(&'a str),
}

impl std::fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local(holder) => write!(f, "local:{holder}"),
        }
    }
}

/// Everything guarded by the knowledgebase lock.
#[derive(Debug, Default)]
struct KbState {
    entities: EntityRegistry,
    constraints: ConstraintRegistry,
    inverses: InverseRegistry,
    global: RelationGraph,
}

impl KbState {
    /// Resolve, normalize and validate a write without touching storage.
    ///
    /// Returns the relation name and triple to store.
    fn stage_write(
        &self,
        subject: &str,
        relation: &str,
        target: &str,
        certainty: Certainty,
    ) -> KbResult<(String, Triple)> {
        let subject = self.entities.lookup(subject)?;
        let target = self.entities.lookup(target)?;

        let form = self.inverses.storage_form(relation);
        let (subject, target) = if form.swap {
            (target, subject)
        } else {
            (subject, target)
        };

        self.constraints.check(form.relation, subject, target)?;
        // The stored fact also reads as `partner(target, subject)`, so the
        // partner's constraints must hold in that orientation.
        if let Some(partner) = self
            .inverses
            .inverse_of(form.relation)
            .filter(|partner| *partner != form.relation)
        {
            self.constraints.check(partner, target, subject)?;
        }

        let triple = Triple::new(&subject.name, &target.name).with_certainty(certainty);
        Ok((form.relation.to_string(), triple))
    }

    /// Direct matches followed by inverse-derived matches, in caller orientation.
    fn find_in(&self, graph: &RelationGraph, query: &RelationQuery) -> Vec<Triple> {
        let mut results = graph.query(query);
        if let Some(inverse) = self.inverses.inverse_of(&query.relation) {
            results.extend(
                graph
                    .query(&query.inverted(inverse))
                    .into_iter()
                    .map(Triple::swapped),
            );
        }
        results
    }

    /// Whether `graph` stores the fact at exactly `certainty`, directly or
    /// through the declared inverse.
    fn holds_in(&self, graph: &RelationGraph, subject: &str, relation: &str, target: &str, certainty: Certainty) -> bool {
        graph.certainty_of(subject, relation, target) == Some(certainty)
            || self
                .inverses
                .inverse_of(relation)
                .is_some_and(|inverse| graph.certainty_of(target, inverse, subject) == Some(certainty))
    }

    /// Whether `graph` has any match for `query`, directly or through the
    /// declared inverse.
    fn contains_in(&self, graph: &RelationGraph, query: &RelationQuery) -> bool {
        graph.contains(query)
            || self
                .inverses
                .inverse_of(&query.relation)
                .is_some_and(|inverse| graph.contains(&query.inverted(inverse)))
    }

    fn graph(&self, scope: Scope<'_>) -> Option<&RelationGraph> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::Local(holder) => self.entities.beliefs(holder).ok(),
        }
    }
}

/// The doxa knowledgebase.
///
/// Owns the entity registry, constraint and inverse registries, and the global
/// scope. All state sits behind one lock so that a write (or an inverse-aware
/// read) sees every structure consistently.
pub struct Knowledgebase {
    config: KbConfig,
    state: RwLock<KbState>,
}

impl Knowledgebase {
    /// Create an empty knowledgebase.
    pub fn new(config: KbConfig) -> Self {
        tracing::info!(
            default_certainty = config.default_certainty.get(),
            strict_registration = config.strict_registration,
            "initializing knowledgebase"
        );
        Self {
            config,
            state: RwLock::new(KbState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, KbState> {
        self.state.read().expect("knowledgebase lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, KbState> {
        self.state.write().expect("knowledgebase lock poisoned")
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Register an entity, creating its empty belief scope.
    ///
    /// Re-registering a name replaces the record and discards its beliefs
    /// unless [`KbConfig::strict_registration`] is set.
    pub fn register(&self, meta: EntityMeta) -> KbResult<()> {
        let name = meta.name.clone();
        let replaced = self
            .write()
            .entities
            .register(meta, self.config.strict_registration)?;
        match replaced {
            Some(old) => tracing::debug!(entity = %name, previous = %old, "entity re-registered, beliefs reset"),
            None => tracing::debug!(entity = %name, "entity registered"),
        }
        Ok(())
    }

    /// Register an untyped or typed entity by name.
    pub fn register_named(&self, name: &str, kind: Option<&str>) -> KbResult<()> {
        let meta = EntityMeta {
            name: name.to_string(),
            kind: kind.map(str::to_string),
        };
        self.register(meta)
    }

    /// Look up an entity's metadata.
    pub fn lookup(&self, name: &str) -> KbResult<EntityMeta> {
        Ok(self.read().entities.lookup(name)?.clone())
    }

    /// A belief view of a registered entity.
    pub fn entity(&self, name: &str) -> KbResult<Entity<'_>> {
        let meta = self.lookup(name)?;
        Ok(Entity::new(self, meta))
    }

    /// All registered entities, sorted by name.
    pub fn entities(&self) -> Vec<EntityMeta> {
        self.read().entities.all()
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Require `subject` and/or `target` types for every write of `relation`.
    ///
    /// Constraints accumulate and must all hold.
    pub fn constrain(&self, relation: &str, subject: Option<&str>, target: Option<&str>) {
        tracing::debug!(relation, subject, target, "constraint registered");
        self.write()
            .constraints
            .constrain(relation, TypeConstraint::new(subject, target));
    }

    /// Declare `relation` and `inverse` interchangeable with swapped roles.
    ///
    /// Facts are stored under `inverse`.
    pub fn declare_inverse(&self, relation: &str, inverse: &str) {
        let displaced = self.write().inverses.declare(relation, inverse);
        for old in &displaced {
            tracing::warn!(
                relation = %old.relation,
                inverse = %old.inverse,
                "inverse pairing displaced by re-declaration"
            );
        }
        tracing::debug!(relation, inverse, "inverse declared");
    }

    /// The declared inverse of `relation`, if any.
    pub fn inverse_of(&self, relation: &str) -> Option<String> {
        self.read().inverses.inverse_of(relation).map(str::to_string)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Assert `subject relation target` with the given certainty into `scope`.
    ///
    /// Both entities must be registered. If `relation` has a declared inverse
    /// the fact may be stored under the inverse name with subject and target
    /// swapped; constraints are checked against that stored form. A rejected
    /// write leaves every scope untouched.
    pub fn assert_relationship(
        &self,
        subject: &str,
        relation: &str,
        target: &str,
        certainty: impl Into<Certainty>,
        scope: Scope<'_>,
    ) -> KbResult<()> {
        let certainty = certainty.into();
        let mut state = self.write();

        let staged = state.stage_write(subject, relation, target, certainty).and_then(|staged| {
            if let Scope::Local(holder) = scope {
                state.entities.lookup(holder)?;
            }
            Ok(staged)
        });
        let (stored_relation, triple) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                tracing::warn!(subject, relation, target, %scope, error = %e, "write rejected");
                return Err(e);
            }
        };

        let graph = match scope {
            Scope::Global => &mut state.global,
            Scope::Local(holder) => state.entities.beliefs_mut(holder)?,
        };
        let outcome = graph.upsert(&stored_relation, triple.clone());

        tracing::debug!(
            relation = %stored_relation,
            subject = %triple.subject,
            target = %triple.target,
            certainty = triple.certainty.get(),
            %scope,
            updated = matches!(outcome, Upsert::Updated { .. }),
            "relationship stored"
        );
        Ok(())
    }

    /// Assert a global fact with the configured default certainty.
    pub fn assert_default(&self, subject: &str, relation: &str, target: &str) -> KbResult<()> {
        self.assert_relationship(
            subject,
            relation,
            target,
            self.config.default_certainty,
            Scope::Global,
        )
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Triples matching `query` in one scope, inverse-aware.
    ///
    /// Direct matches come first, then matches stored under the declared
    /// inverse, swapped back into the query's orientation. A local scope of an
    /// unknown entity reads as empty.
    pub fn find_relationships(&self, query: &RelationQuery, scope: Scope<'_>) -> Vec<Triple> {
        let state = self.read();
        state
            .graph(scope)
            .map(|graph| state.find_in(graph, query))
            .unwrap_or_default()
    }

    /// Local-then-global matches for `holder`, under a single read lock.
    pub(crate) fn find_merged(&self, holder: &str, query: &RelationQuery) -> Vec<Triple> {
        let state = self.read();
        let mut results = state
            .graph(Scope::Local(holder))
            .map(|graph| state.find_in(graph, query))
            .unwrap_or_default();
        results.extend(state.find_in(&state.global, query));
        results
    }

    /// Whether the local scope of `holder` or the global scope has any match.
    pub(crate) fn exists_merged(&self, holder: &str, query: &RelationQuery) -> bool {
        let state = self.read();
        state
            .graph(Scope::Local(holder))
            .is_some_and(|graph| state.contains_in(graph, query))
            || state.contains_in(&state.global, query)
    }

    /// Whether `scope` stores exactly `subject relation target` at `certainty`,
    /// under either name of an inverse pair.
    pub(crate) fn holds(
        &self,
        scope: Scope<'_>,
        subject: &str,
        relation: &str,
        target: &str,
        certainty: Certainty,
    ) -> bool {
        let state = self.read();
        state
            .graph(scope)
            .is_some_and(|graph| state.holds_in(graph, subject, relation, target, certainty))
    }

    /// The stored global facts: relation name → ordered triples.
    pub fn global_relations(&self) -> BTreeMap<String, Vec<Triple>> {
        self.read().global.to_map()
    }

    /// The stored facts of one scope. Unknown entities read as empty.
    pub fn scope_relations(&self, scope: Scope<'_>) -> BTreeMap<String, Vec<Triple>> {
        self.read()
            .graph(scope)
            .map(RelationGraph::to_map)
            .unwrap_or_default()
    }

    /// The knowledgebase configuration.
    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    /// Summary counts.
    pub fn info(&self) -> KbInfo {
        let state = self.read();
        KbInfo {
            entity_count: state.entities.len(),
            constraint_count: state.constraints.len(),
            inverse_pairs: state.inverses.pairs().len(),
            global_relations: state.global.relation_count(),
            global_triples: state.global.triple_count(),
            belief_triples: state
                .entities
                .scopes()
                .map(|(_, beliefs)| beliefs.triple_count())
                .sum(),
        }
    }

    /// A serializable copy of the whole knowledgebase.
    pub fn snapshot(&self) -> KbSnapshot {
        let state = self.read();
        KbSnapshot {
            entities: state.entities.all(),
            inverses: state.inverses.pairs(),
            constraints: state.constraints.to_map(),
            global: state.global.to_map(),
            beliefs: state
                .entities
                .scopes()
                .filter(|(_, beliefs)| !beliefs.is_empty())
                .map(|(meta, beliefs)| (meta.name.clone(), beliefs.to_map()))
                .collect(),
        }
    }
}

impl Default for Knowledgebase {
    fn default() -> Self {
        Self::new(KbConfig::default())
    }
}

impl std::fmt::Debug for Knowledgebase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Knowledgebase")
            .field("config", &self.config)
            .field("info", &self.info())
            .finish()
    }
}

/// Summary information about a knowledgebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbInfo {
    pub entity_count: usize,
    pub constraint_count: usize,
    pub inverse_pairs: usize,
    pub global_relations: usize,
    pub global_triples: usize,
    pub belief_triples: usize,
}

impl std::fmt::Display for KbInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "doxa knowledgebase info")?;
        writeln!(f, "  entities:        {}", self.entity_count)?;
        writeln!(f, "  constraints:     {}", self.constraint_count)?;
        writeln!(f, "  inverse pairs:   {}", self.inverse_pairs)?;
        writeln!(f, "  relations:       {}", self.global_relations)?;
        writeln!(f, "  global triples:  {}", self.global_triples)?;
        writeln!(f, "  belief triples:  {}", self.belief_triples)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConstraintError, EntityError, KbError, Side};

    fn hamlet_kb() -> Knowledgebase {
        let kb = Knowledgebase::default();
        kb.register_named("elsinore", Some("place")).unwrap();
        kb.register_named("hamlet", Some("person")).unwrap();
        kb
    }

    #[test]
    fn entity_not_found_before_any_write() {
        let kb = Knowledgebase::default();
        let err = kb
            .assert_relationship("foo", "bar", "bizz", 1, Scope::Global)
            .unwrap_err();
        assert!(matches!(err, KbError::Entity(EntityError::NotFound { .. })));

        kb.register_named("foo", None).unwrap();
        let err = kb
            .assert_relationship("foo", "bar", "bizz", 1, Scope::Global)
            .unwrap_err();
        assert!(matches!(err, KbError::Entity(EntityError::NotFound { ref name }) if name == "bizz"));

        kb.register_named("bizz", None).unwrap();
        kb.assert_relationship("foo", "bar", "bizz", 1, Scope::Global)
            .unwrap();
        assert_eq!(kb.info().global_triples, 1);
    }

    #[test]
    fn constrained_relationship() {
        let kb = hamlet_kb();
        kb.constrain("located", Some("person"), Some("place"));

        let err = kb
            .assert_relationship("elsinore", "located", "hamlet", 1, Scope::Global)
            .unwrap_err();
        assert!(matches!(err, KbError::Constraint(ConstraintError::Violation { .. })));
        assert!(kb.global_relations().is_empty());

        kb.assert_relationship("hamlet", "located", "elsinore", 1, Scope::Global)
            .unwrap();
        let found = kb.find_relationships(
            &RelationQuery::new("located").subject("hamlet").target("elsinore"),
            Scope::Global,
        );
        assert_eq!(found, vec![Triple::new("hamlet", "elsinore")]);
    }

    #[test]
    fn inverse_write_is_normalized() {
        let kb = hamlet_kb();
        kb.declare_inverse("location", "located");
        kb.assert_relationship("elsinore", "location", "hamlet", 1, Scope::Global)
            .unwrap();

        assert_eq!(
            kb.global_relations(),
            BTreeMap::from([("located".to_string(), vec![Triple::new("hamlet", "elsinore")])])
        );
    }

    #[test]
    fn inverse_constraints_use_stored_direction() {
        let kb = hamlet_kb();
        kb.constrain("located", Some("person"), Some("place"));
        kb.declare_inverse("location", "located");

        let err = kb
            .assert_relationship("elsinore", "location", "elsinore", 1, Scope::Global)
            .unwrap_err();
        assert!(matches!(err, KbError::Constraint(_)));

        kb.assert_relationship("elsinore", "location", "hamlet", 1, Scope::Global)
            .unwrap();
    }

    #[test]
    fn post_declaration_reads_see_both_directions() {
        let kb = hamlet_kb();
        kb.assert_relationship("elsinore", "location", "hamlet", 1, Scope::Global)
            .unwrap();
        assert_eq!(
            kb.global_relations(),
            BTreeMap::from([("location".to_string(), vec![Triple::new("elsinore", "hamlet")])])
        );
        kb.declare_inverse("location", "located");

        let located = kb.find_relationships(
            &RelationQuery::new("located").subject("hamlet").target("elsinore"),
            Scope::Global,
        );
        assert_eq!(located, vec![Triple::new("hamlet", "elsinore")]);

        let location = kb.find_relationships(
            &RelationQuery::new("location").subject("elsinore").target("hamlet"),
            Scope::Global,
        );
        assert_eq!(location, vec![Triple::new("elsinore", "hamlet")]);
    }

    #[test]
    fn all_relationships_direct_then_inverse() {
        let kb = Knowledgebase::default();
        for name in ["elsinore", "paris", "hamlet", "laertes"] {
            kb.register_named(name, None).unwrap();
        }
        kb.assert_relationship("elsinore", "location", "hamlet", 1, Scope::Global)
            .unwrap();
        kb.assert_relationship("laertes", "located", "paris", 1, Scope::Global)
            .unwrap();
        kb.declare_inverse("location", "located");

        let result = kb.find_relationships(&RelationQuery::new("location"), Scope::Global);
        assert_eq!(
            result,
            vec![Triple::new("elsinore", "hamlet"), Triple::new("paris", "laertes")]
        );
    }

    #[test]
    fn local_writes_stay_local() {
        let kb = hamlet_kb();
        kb.assert_relationship("hamlet", "located", "elsinore", -1, Scope::Local("hamlet"))
            .unwrap();

        assert!(kb.global_relations().is_empty());
        assert!(kb.scope_relations(Scope::Local("elsinore")).is_empty());
        let local = kb.scope_relations(Scope::Local("hamlet"));
        assert_eq!(local["located"], vec![Triple::new("hamlet", "elsinore").with_certainty(-1)]);
    }

    #[test]
    fn unknown_holder_rejects_write_and_reads_empty() {
        let kb = hamlet_kb();
        let err = kb
            .assert_relationship("hamlet", "located", "elsinore", 1, Scope::Local("ghost"))
            .unwrap_err();
        assert!(matches!(err, KbError::Entity(EntityError::NotFound { .. })));
        assert!(kb.find_relationships(&RelationQuery::new("located"), Scope::Local("ghost")).is_empty());
        assert_eq!(kb.info().global_triples, 0);
    }

    #[test]
    fn unknown_relation_reads_empty() {
        let kb = hamlet_kb();
        assert!(kb.find_relationships(&RelationQuery::new("nothing"), Scope::Global).is_empty());
    }

    #[test]
    fn default_certainty_comes_from_config() {
        let kb = Knowledgebase::new(KbConfig {
            default_certainty: Certainty::SUSPECTED,
            ..Default::default()
        });
        kb.register_named("a", None).unwrap();
        kb.register_named("b", None).unwrap();
        kb.assert_default("a", "r", "b").unwrap();
        assert_eq!(kb.global_relations()["r"][0].certainty, Certainty::SUSPECTED);
    }

    #[test]
    fn strict_registration_from_config() {
        let kb = Knowledgebase::new(KbConfig {
            strict_registration: true,
            ..Default::default()
        });
        kb.register_named("hamlet", None).unwrap();
        assert!(kb.register_named("hamlet", Some("prince")).is_err());
    }

    #[test]
    fn config_from_toml() {
        let config = KbConfig::from_toml_str("strict_registration = true\n").unwrap();
        assert!(config.strict_registration);
        assert_eq!(config.default_certainty, Certainty::AFFIRMED);

        let config = KbConfig::from_toml_str("default_certainty = -1").unwrap();
        assert_eq!(config.default_certainty, Certainty::SUSPECTED);

        assert!(KbConfig::from_toml_str("default_certainty = \"high\"").is_err());
    }

    #[test]
    fn info_counts() {
        let kb = hamlet_kb();
        kb.constrain("located", Some("person"), Some("place"));
        kb.declare_inverse("location", "located");
        kb.assert_relationship("hamlet", "located", "elsinore", 1, Scope::Global)
            .unwrap();
        kb.assert_relationship("hamlet", "located", "elsinore", 0, Scope::Local("hamlet"))
            .unwrap();

        let info = kb.info();
        assert_eq!(info.entity_count, 2);
        assert_eq!(info.constraint_count, 1);
        assert_eq!(info.inverse_pairs, 1);
        assert_eq!(info.global_triples, 1);
        assert_eq!(info.belief_triples, 1);
        assert!(info.to_string().starts_with("doxa knowledgebase info"));
    }

    #[test]
    fn constraint_on_partner_name_is_enforced() {
        let kb = hamlet_kb();
        kb.declare_inverse("location", "located");
        kb.constrain("location", Some("place"), Some("person"));

        let err = kb
            .assert_relationship("elsinore", "located", "hamlet", 1, Scope::Global)
            .unwrap_err();
        match err {
            KbError::Constraint(ConstraintError::Violation { relation, side, .. }) => {
                assert_eq!(relation, "location");
                assert_eq!(side, Side::Subject);
            }
            other => panic!("expected a constraint violation, got {other:?}"),
        }
        assert!(kb.global_relations().is_empty());

        kb.assert_relationship("hamlet", "located", "elsinore", 1, Scope::Global)
            .unwrap();
        kb.assert_relationship("elsinore", "location", "hamlet", 1, Scope::Global)
            .unwrap();
        assert_eq!(kb.info().global_triples, 1);
    }

    #[test]
    fn reversed_redeclaration_keeps_storage_name() {
        let kb = hamlet_kb();
        kb.declare_inverse("location", "located");
        kb.assert_relationship("hamlet", "located", "elsinore", 1, Scope::Global)
            .unwrap();
        kb.declare_inverse("located", "location");
        kb.assert_relationship("hamlet", "located", "elsinore", 0, Scope::Global)
            .unwrap();

        assert_eq!(
            kb.global_relations(),
            BTreeMap::from([(
                "located".to_string(),
                vec![Triple::new("hamlet", "elsinore").with_certainty(0)]
            )])
        );
    }
}
