//! Rich diagnostic error types for the doxa knowledgebase.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! which write was rejected and why.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the knowledgebase.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scenario(#[from] ScenarioError),
}

// ---------------------------------------------------------------------------
// Entity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EntityError {
    #[error("no entity found with name '{name}'")]
    #[diagnostic(
        code(doxa::entity::not_found),
        help(
            "Every subject, target and belief holder must be registered before use. \
             Call `register(\"{name}\", ..)` first."
        )
    )]
    NotFound { name: String },

    #[error("entity '{name}' is already registered")]
    #[diagnostic(
        code(doxa::entity::duplicate),
        help(
            "Strict registration is enabled, so entities cannot be replaced. \
             Set `strict_registration = false` to allow re-registration \
             (which also discards the entity's private beliefs)."
        )
    )]
    Duplicate { name: String },
}

// ---------------------------------------------------------------------------
// Constraint errors
// ---------------------------------------------------------------------------

/// Which end of a relationship a constraint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Subject,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subject => write!(f, "Subject"),
            Self::Target => write!(f, "Target"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConstraintError {
    #[error("{side} of {relation} must be of type {expected}; got entity of type {actual} instead")]
    #[diagnostic(
        code(doxa::constraint::violation),
        help(
            "Every constraint registered for '{relation}' must hold. \
             Relations with a declared inverse are checked after normalization, \
             so the constraint applies to the stored direction."
        )
    )]
    Violation {
        relation: String,
        side: Side,
        expected: String,
        actual: String,
    },
}

// ---------------------------------------------------------------------------
// Scenario errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ScenarioError {
    #[error("I/O error reading {path}: {source}")]
    #[diagnostic(
        code(doxa::scenario::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scenario at {path}: {message}")]
    #[diagnostic(
        code(doxa::scenario::parse),
        help(
            "A scenario is a JSON object with optional `entities`, `constraints`, \
             `inverses`, `facts` and `beliefs` arrays."
        )
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration at {path}: {message}")]
    #[diagnostic(
        code(doxa::scenario::invalid_config),
        help(
            "The config file is TOML with optional `default_certainty` (integer) \
             and `strict_registration` (boolean) keys."
        )
    )]
    InvalidConfig { path: String, message: String },
}

/// Convenience alias for functions returning doxa results.
pub type KbResult<T> = std::result::Result<T, KbError>;
