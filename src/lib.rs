// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # doxa
//!
//! An in-memory relationship store with typed entities, directed named
//! relations tagged with a certainty, inverse relation pairs, type constraints,
//! and per-entity belief scopes layered over a shared global fact base.
//!
//! ## Architecture
//!
//! - **Relation storage** (`graph`): one insertion-ordered scope per [`graph::RelationGraph`]
//! - **Registries** (`entity`, `constraint`, `inverse`): names, type gates, inverse pairs
//! - **Orchestration** (`engine`): the [`engine::Knowledgebase`] write/read paths
//! - **Beliefs** (`belief`): `knows` / `suspects` / `thinks` / `rejects` / `certain`
//! - **Ingestion and export** (`scenario`, `export`): JSON in, JSON snapshots out
//!
//! ## Library usage
//!
//! ```
//! use doxa::engine::Knowledgebase;
//!
//! let kb = Knowledgebase::default();
//! kb.register_named("claudius", Some("person")).unwrap();
//! kb.register_named("khamlet", Some("person")).unwrap();
//! kb.register_named("hamlet", Some("person")).unwrap();
//!
//! let claudius = kb.entity("claudius").unwrap();
//! claudius.assert("claudius", "kills", "khamlet", 1).unwrap();
//!
//! assert!(claudius.knows("claudius", "kills", "khamlet"));
//! assert!(!kb.entity("hamlet").unwrap().knows("claudius", "kills", "khamlet"));
//! assert!(kb.global_relations().is_empty());
//! ```

pub mod belief;
pub mod constraint;
pub mod engine;
pub mod entity;
pub mod error;
pub mod export;
pub mod graph;
pub mod inverse;
pub mod scenario;
