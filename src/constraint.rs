//! Type constraints on relations.
//!
//! Each relation name carries a list of `(subject type, target type)` pairs.
//! All registered pairs for a relation must hold on every write, so adding a
//! constraint can only narrow the allowed type combinations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityMeta;
use crate::error::{ConstraintError, Side};

/// One required `(subject type, target type)` pair. `None` leaves that side
/// unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeConstraint {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl TypeConstraint {
    pub fn new(subject: Option<&str>, target: Option<&str>) -> Self {
        Self {
            subject: subject.map(str::to_string),
            target: target.map(str::to_string),
        }
    }

    /// Check one pair against a resolved subject and target.
    fn check(&self, relation: &str, subject: &EntityMeta, target: &EntityMeta) -> Result<(), ConstraintError> {
        for (side, expected, entity) in [
            (Side::Subject, &self.subject, subject),
            (Side::Target, &self.target, target),
        ] {
            let Some(expected) = expected else {
                continue;
            };
            if entity.kind.as_deref() != Some(expected.as_str()) {
                return Err(ConstraintError::Violation {
                    relation: relation.to_string(),
                    side,
                    expected: expected.clone(),
                    actual: entity.kind_label().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Relation name → ordered list of constraint pairs.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    constraints: BTreeMap<String, Vec<TypeConstraint>>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint pair for `relation`.
    pub fn constrain(&mut self, relation: &str, constraint: TypeConstraint) {
        self.constraints
            .entry(relation.to_string())
            .or_default()
            .push(constraint);
    }

    /// Validate a write of `relation` from `subject` to `target`.
    ///
    /// Fails on the first registered pair that does not hold. Pure: never
    /// mutates anything.
    pub fn check(&self, relation: &str, subject: &EntityMeta, target: &EntityMeta) -> Result<(), ConstraintError> {
        self.for_relation(relation)
            .iter()
            .try_for_each(|c| c.check(relation, subject, target))
    }

    /// Constraint pairs registered for `relation`, in registration order.
    pub fn for_relation(&self, relation: &str) -> &[TypeConstraint] {
        self.constraints
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A copy of every registered constraint, keyed by relation name.
    pub fn to_map(&self) -> BTreeMap<String, Vec<TypeConstraint>> {
        self.constraints.clone()
    }

    /// Number of registered constraint pairs across all relations.
    pub(crate) fn len(&self) -> usize {
        self.constraints.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str) -> EntityMeta {
        EntityMeta::new(name).with_kind("person")
    }

    fn place(name: &str) -> EntityMeta {
        EntityMeta::new(name).with_kind("place")
    }

    #[test]
    fn unconstrained_relation_accepts_anything() {
        let reg = ConstraintRegistry::new();
        assert!(reg.check("located", &place("elsinore"), &EntityMeta::new("x")).is_ok());
    }

    #[test]
    fn subject_and_target_types_are_enforced() {
        let mut reg = ConstraintRegistry::new();
        reg.constrain("located", TypeConstraint::new(Some("person"), Some("place")));

        assert!(reg.check("located", &person("hamlet"), &place("elsinore")).is_ok());

        let err = reg
            .check("located", &place("elsinore"), &person("hamlet"))
            .unwrap_err();
        let ConstraintError::Violation { side, expected, actual, .. } = err;
        assert_eq!(side, Side::Subject);
        assert_eq!(expected, "person");
        assert_eq!(actual, "place");
    }

    #[test]
    fn target_violation_reported_when_subject_holds() {
        let mut reg = ConstraintRegistry::new();
        reg.constrain("located", TypeConstraint::new(Some("person"), Some("place")));
        let err = reg
            .check("located", &person("hamlet"), &person("laertes"))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::Violation { side: Side::Target, .. }));
    }

    #[test]
    fn untyped_entity_fails_typed_side() {
        let mut reg = ConstraintRegistry::new();
        reg.constrain("located", TypeConstraint::new(None, Some("place")));
        let err = reg
            .check("located", &person("hamlet"), &EntityMeta::new("limbo"))
            .unwrap_err();
        let ConstraintError::Violation { actual, .. } = err;
        assert_eq!(actual, "untyped");
    }

    #[test]
    fn multiple_constraints_are_conjunctive() {
        let mut reg = ConstraintRegistry::new();
        reg.constrain("rules", TypeConstraint::new(Some("person"), None));
        reg.constrain("rules", TypeConstraint::new(None, Some("place")));

        assert!(reg.check("rules", &person("claudius"), &place("denmark")).is_ok());
        // Each pair alone would allow these; together they do not.
        assert!(reg.check("rules", &person("claudius"), &person("hamlet")).is_err());
        assert!(reg.check("rules", &place("norway"), &place("denmark")).is_err());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.for_relation("rules").len(), 2);
    }
}
