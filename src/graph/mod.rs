//! Relation storage: triples, certainty tags, and the exact-match query filter.
//!
//! A scope stores facts as `(subject, target, certainty)` triples keyed by a
//! relation name. The same [`Triple`] and [`RelationQuery`] types are shared by
//! the global scope and every entity's private scope.
//!
//! - **Storage** ([`RelationGraph`]): one scope, ordered per relation name
//! - **Filters** ([`RelationQuery`]): optional subject/target/certainty matches

pub mod index;

use serde::{Deserialize, Serialize};

pub use index::RelationGraph;

/// Belief strength attached to a stored triple.
///
/// Any value is accepted and matched by exact equality. The belief algebra only
/// gives meaning to [`Certainty::AFFIRMED`], [`Certainty::DENIED`] and
/// [`Certainty::SUSPECTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Certainty(pub i64);

impl Certainty {
    /// Affirmed true.
    pub const AFFIRMED: Certainty = Certainty(1);
    /// Affirmed false (explicit denial).
    pub const DENIED: Certainty = Certainty(0);
    /// Suspected, unconfirmed.
    pub const SUSPECTED: Certainty = Certainty(-1);

    /// Get the underlying value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for Certainty {
    fn default() -> Self {
        Self::AFFIRMED
    }
}

impl From<i64> for Certainty {
    fn from(raw: i64) -> Self {
        Certainty(raw)
    }
}

// Unsuffixed literals (`kb.assert_relationship(.., 1, ..)`) default to i32.
impl From<i32> for Certainty {
    fn from(raw: i32) -> Self {
        Certainty(i64::from(raw))
    }
}

impl std::fmt::Display for Certainty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::AFFIRMED => write!(f, "affirmed"),
            Self::DENIED => write!(f, "denied"),
            Self::SUSPECTED => write!(f, "suspected"),
            Certainty(other) => write!(f, "certainty({other})"),
        }
    }
}

/// A stored fact under one relation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Name of the subject entity.
    pub subject: String,
    /// Name of the target entity.
    pub target: String,
    /// Belief strength.
    pub certainty: Certainty,
}

impl Triple {
    /// Create an affirmed triple.
    pub fn new(subject: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            target: target.into(),
            certainty: Certainty::AFFIRMED,
        }
    }

    /// Set the certainty.
    pub fn with_certainty(mut self, certainty: impl Into<Certainty>) -> Self {
        self.certainty = certainty.into();
        self
    }

    /// The same fact read in the opposite direction.
    pub fn swapped(self) -> Self {
        Self {
            subject: self.target,
            target: self.subject,
            certainty: self.certainty,
        }
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T, i64)> for Triple {
    fn from((subject, target, certainty): (S, T, i64)) -> Self {
        Triple::new(subject, target).with_certainty(certainty)
    }
}

/// Exact-match filter over one relation name.
///
/// Unset filters match everything. `certainty: None` (not filtering) is distinct
/// from `Some(Certainty::DENIED)` (filtering for the literal value 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationQuery {
    /// The relation name to search. Always required.
    pub relation: String,
    /// Required subject name, if filtering.
    pub subject: Option<String>,
    /// Required target name, if filtering.
    pub target: Option<String>,
    /// Required certainty, if filtering.
    pub certainty: Option<Certainty>,
}

impl RelationQuery {
    /// Match every triple stored under `relation`.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            subject: None,
            target: None,
            certainty: None,
        }
    }

    /// Require a subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Require a target.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Require a certainty.
    pub fn certainty(mut self, certainty: impl Into<Certainty>) -> Self {
        self.certainty = Some(certainty.into());
        self
    }

    /// Replace the certainty filter, including clearing it.
    pub fn with_certainty(mut self, certainty: Option<Certainty>) -> Self {
        self.certainty = certainty;
        self
    }

    /// Whether a stored triple passes every supplied filter.
    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_deref().is_none_or(|s| s == triple.subject)
            && self.target.as_deref().is_none_or(|t| t == triple.target)
            && self.certainty.is_none_or(|c| c == triple.certainty)
    }

    /// The query to run against `inverse` to find facts stored in the
    /// opposite direction: subject and target filters trade places.
    pub fn inverted(&self, inverse: &str) -> Self {
        Self {
            relation: inverse.to_string(),
            subject: self.target.clone(),
            target: self.subject.clone(),
            certainty: self.certainty,
        }
    }
}
