//! Scenario ingestion: build a knowledgebase from a JSON description.
//!
//! Sections are applied in dependency order: entities, constraints, inverses,
//! global facts, then per-entity beliefs. Facts and beliefs go through the
//! ordinary write path, so the first rejected write stops the run. Writes
//! applied before it are kept.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Knowledgebase, Scope};
use crate::entity::EntityMeta;
use crate::error::{KbResult, ScenarioError};
use crate::graph::Certainty;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub relation: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseSpec {
    pub relation: String,
    pub inverse: String,
}

/// A global fact, or a private one when `holder` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSpec {
    #[serde(default)]
    pub holder: Option<String>,
    pub subject: String,
    pub relation: String,
    pub target: String,
    /// Falls back to the knowledgebase's default certainty.
    #[serde(default)]
    pub certainty: Option<Certainty>,
}

/// A complete knowledgebase setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub entities: Vec<EntityMeta>,
    pub constraints: Vec<ConstraintSpec>,
    pub inverses: Vec<InverseSpec>,
    pub facts: Vec<FactSpec>,
    pub beliefs: Vec<FactSpec>,
}

/// Counts of what a scenario applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub entities: usize,
    pub constraints: usize,
    pub inverses: usize,
    pub facts: usize,
    pub beliefs: usize,
}

impl std::fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entities, {} constraints, {} inverse pairs, {} facts, {} beliefs",
            self.entities, self.constraints, self.inverses, self.facts, self.beliefs
        )
    }
}

impl Scenario {
    /// Parse a scenario from JSON text. `origin` names the source in errors.
    pub fn from_json_str(content: &str, origin: &str) -> KbResult<Self> {
        Ok(serde_json::from_str(content).map_err(|e| ScenarioError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> KbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    /// Apply every section to `kb`.
    pub fn apply(&self, kb: &Knowledgebase) -> KbResult<ScenarioReport> {
        let mut report = ScenarioReport::default();

        for meta in &self.entities {
            kb.register(meta.clone())?;
            report.entities += 1;
        }
        for c in &self.constraints {
            kb.constrain(&c.relation, c.subject.as_deref(), c.target.as_deref());
            report.constraints += 1;
        }
        for inv in &self.inverses {
            kb.declare_inverse(&inv.relation, &inv.inverse);
            report.inverses += 1;
        }
        for fact in &self.facts {
            Self::write(kb, fact, fact.holder.as_deref())?;
            report.facts += 1;
        }
        for belief in &self.beliefs {
            let Some(holder) = belief.holder.as_deref() else {
                return Err(ScenarioError::Parse {
                    path: "<beliefs>".into(),
                    message: format!(
                        "belief '{} {} {}' has no holder",
                        belief.subject, belief.relation, belief.target
                    ),
                }
                .into());
            };
            Self::write(kb, belief, Some(holder))?;
            report.beliefs += 1;
        }

        tracing::info!(%report, "scenario applied");
        Ok(report)
    }

    fn write(kb: &Knowledgebase, fact: &FactSpec, holder: Option<&str>) -> KbResult<()> {
        let certainty = fact.certainty.unwrap_or(kb.config().default_certainty);
        let scope = holder.map_or(Scope::Global, Scope::Local);
        kb.assert_relationship(&fact.subject, &fact.relation, &fact.target, certainty, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;

    const HAMLET: &str = r#"{
        "entities": [
            {"name": "elsinore", "type": "place"},
            {"name": "hamlet", "type": "person"},
            {"name": "claudius", "type": "person"},
            {"name": "khamlet", "type": "person"}
        ],
        "constraints": [{"relation": "located", "subject": "person", "target": "place"}],
        "inverses": [{"relation": "location", "inverse": "located"}],
        "facts": [{"subject": "elsinore", "relation": "location", "target": "hamlet"}],
        "beliefs": [
            {"holder": "claudius", "subject": "claudius", "relation": "kills", "target": "khamlet"},
            {"holder": "hamlet", "subject": "claudius", "relation": "kills", "target": "khamlet", "certainty": -1}
        ]
    }"#;

    #[test]
    fn parse_and_apply() {
        let scenario = Scenario::from_json_str(HAMLET, "hamlet.json").unwrap();
        let kb = Knowledgebase::default();
        let report = scenario.apply(&kb).unwrap();

        assert_eq!(
            report,
            ScenarioReport {
                entities: 4,
                constraints: 1,
                inverses: 1,
                facts: 1,
                beliefs: 2,
            }
        );
        assert!(kb.global_relations().contains_key("located"));
        let hamlet = kb.entity("hamlet").unwrap();
        assert!(hamlet.suspects("claudius", "kills", "khamlet"));
        assert!(kb.entity("claudius").unwrap().knows("claudius", "kills", "khamlet"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let scenario = Scenario::from_json_str("{}", "empty.json").unwrap();
        assert_eq!(scenario, Scenario::default());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Scenario::from_json_str("{\"entities\": 3}", "bad.json").unwrap_err();
        assert!(matches!(err, KbError::Scenario(ScenarioError::Parse { .. })));
    }

    #[test]
    fn belief_without_holder_is_rejected() {
        let scenario = Scenario::from_json_str(
            r#"{"entities": [{"name": "a"}, {"name": "b"}],
                "beliefs": [{"subject": "a", "relation": "r", "target": "b"}]}"#,
            "inline",
        )
        .unwrap();
        let err = scenario.apply(&Knowledgebase::default()).unwrap_err();
        assert!(matches!(err, KbError::Scenario(ScenarioError::Parse { .. })));
    }

    #[test]
    fn first_failing_write_stops_the_run() {
        let scenario = Scenario::from_json_str(
            r#"{"entities": [{"name": "a"}, {"name": "b"}],
                "facts": [
                    {"subject": "a", "relation": "r", "target": "b"},
                    {"subject": "a", "relation": "r", "target": "nobody"},
                    {"subject": "b", "relation": "r", "target": "a"}
                ]}"#,
            "inline",
        )
        .unwrap();
        let kb = Knowledgebase::default();
        let err = scenario.apply(&kb).unwrap_err();
        assert!(matches!(err, KbError::Entity(_)));
        assert_eq!(kb.global_relations()["r"].len(), 1);
    }
}
