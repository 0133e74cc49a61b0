//! Crate root: public surface, core value types, and engine-wide invariants
//!
//! `rpqcheck` evaluates *Regular Path Constraints* (RPCs) of the form
//! `name = LHS ⊆ RHS` over a directed labelled graph and quantifies how
//! inconsistent the graph is with respect to a set of such constraints.
//! `LHS` and `RHS` are *Regular Path Queries*: regular expressions over edge
//! labels denoting the set of node pairs connected by a conforming path.
//!
//! ## Invariants
//!
//! - **Set semantics.** An RPQ compiles to a *disjunction of sequences*;
//!   parsing never produces an empty sequence or an empty disjunction from
//!   well-formed input. Duplicate alternatives are collapsed.
//! - **Bounded Kleene.** `*` is expanded to at most [`parser::KLEENE_CAP`]
//!   repetitions. This is a deliberate under-approximation; matching the
//!   infinite language is out of scope.
//! - **Determinism.** Given a fixed graph, `pairs(seq)` is deterministic,
//!   violating pairs are visited in sorted order, and greedy tie-breaks are
//!   fixed, so a whole engine invocation is reproducible.
//! - **No cross-request state.** All evaluation state (including the
//!   per-sequence memo in [`eval::PairCache`]) lives for a single call and
//!   is dropped on return. The storage backend is borrowed, never owned.
//!
//! The failure mode for every violated expectation is a precise error
//! ([`EngineError`] and the per-module error types it wraps), never a panic
//! in library code.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment-driven settings for the API server and CLI.
pub mod config;
/// Expansion, symbol validation, memoised evaluation, inclusion checking.
pub mod eval;
/// Tokenizer for the RPC surface syntax.
pub mod lexer;
/// Inconsistency measures engine (fast and slow paths).
pub mod measures;
/// Abstract syntax plus the RPQ/RPC recursive-descent parsers.
pub mod parser;
/// Storage-engine interface and the in-memory reference backend.
pub mod probe;
/// Saved constraint bundles and named graph instances.
pub mod store;

// ============================================================================
// Canonical value types
// ============================================================================

/// Opaque node identity as yielded by the storage backend.
///
/// The engine only relies on equality, hashing and a total order (used to
/// sort reported violations); integer ids round-trip as JSON numbers,
/// UUID-like ids as JSON strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    /// Dense integer identity (e.g. a storage-internal id).
    Int(i64),
    /// Textual identity (e.g. a UUID or an application key).
    Text(String),
}

impl From<i64> for NodeId {
    fn from(v: i64) -> Self {
        NodeId::Int(v)
    }
}

impl From<&str> for NodeId {
    fn from(v: &str) -> Self {
        NodeId::Text(v.to_owned())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(v) => write!(f, "{v}"),
            NodeId::Text(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered pair of node identities.
pub type Pair = (NodeId, NodeId);

/// Deduplicated set of [`Pair`]s: the denotation of a sequence or an RPQ.
pub type PairSet = HashSet<Pair>;

/// A concrete labelled edge `(from, to, label)`.
pub type Edge = (NodeId, NodeId, String);

/// An ordered list of edges evidencing membership in some sequence's
/// pair-set. Inverse atoms never produce witnesses.
pub type WitnessPath = Vec<Edge>;

// ============================================================================
// Shared error surface
// ============================================================================

/// Top-level error for engine entry points.
///
/// Lexing, parsing and RPC-splitting failures surface as
/// [`EngineError::Syntax`] (the API maps these to a bad-request signal);
/// storage failures surface as [`EngineError::Probe`] (internal-error
/// signal). Symbol-validation problems are *not* errors at this level: they
/// are reported in-band per constraint.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The constraint text is not a well-formed RPC.
    #[error(transparent)]
    Syntax(#[from] parser::SyntaxError),
    /// The storage backend failed or cancelled mid-request.
    #[error(transparent)]
    Probe(#[from] probe::ProbeError),
}

// ============================================================================
// Root re-exports (single canonical definitions)
// ============================================================================

pub use crate::eval::{
    check_inclusion, check_parsed, expand, validate_symbols, InclusionReport, PairCache,
    Side, SymbolError,
};
pub use crate::lexer::LexError;
pub use crate::measures::{
    compute_measures, compute_measures_parsed, ConstraintReport, MeasureName,
    MeasuresDetails, MeasuresOutcome,
};
pub use crate::parser::{
    parse_rpc, parse_rpq, Atom, ParseError, Rpc, RpcParseError, Rpq, Sequence, SyntaxError,
};
pub use crate::probe::{GraphDoc, GraphProbe, MemoryGraph, ProbeError};
