//! Expansion, validation, and set-valued evaluation of parsed constraints
//!
//! The pieces here sit between the parser and the storage probe:
//!
//! - [`expand`] turns a parsed disjunction into the list of sequences
//!   offered to evaluation, with ε branches removed.
//! - [`validate_symbols`] rejects blank relation labels. It never consults
//!   the graph: an unknown label legitimately denotes the empty pair-set.
//! - [`PairCache`] memoises `pairs(seq)` per request, keyed on the
//!   structural form of the sequence, so each distinct sequence hits the
//!   probe at most once within a call.
//! - [`check_inclusion`] decides a single constraint `LHS ⊆ RHS` and lists
//!   the violating pairs (sorted, capped at [`VIOLATION_CAP`]).

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::parser::{parse_rpc, Rpc, Rpq, Sequence};
use crate::probe::{GraphProbe, ProbeError};
use crate::{EngineError, Pair, PairSet};

/// Reported violations are truncated to this many pairs.
pub const VIOLATION_CAP: usize = 200;

/// Which side of the inclusion an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Side {
    /// Left-hand side.
    #[serde(rename = "LHS")]
    Lhs,
    /// Right-hand side.
    #[serde(rename = "RHS")]
    Rhs,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Lhs => "LHS",
            Side::Rhs => "RHS",
        })
    }
}

/// A rejected atom, located by side and flattened atom position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{side} atom {index}: {reason}")]
pub struct SymbolError {
    /// Side of the inclusion the atom sits on.
    pub side: Side,
    /// 0-based position among the side's atoms, counted across sequences.
    pub index: usize,
    /// What is wrong with the atom.
    pub reason: String,
}

/// Sequences of an RPQ with ε branches removed.
///
/// Parsed RPQs are already ε-free; this is the boundary filter for
/// programmatically built disjunctions.
pub fn expand(rpq: &Rpq) -> Vec<Sequence> {
    rpq.sequences()
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect()
}

/// Reject atoms whose label is blank after trimming.
pub fn validate_symbols(rpc: &Rpc) -> Vec<SymbolError> {
    let mut errors = Vec::new();
    for (side, rpq) in [(Side::Lhs, &rpc.lhs), (Side::Rhs, &rpc.rhs)] {
        let mut index = 0usize;
        for seq in rpq.sequences() {
            for atom in seq.atoms() {
                if atom.label.trim().is_empty() {
                    errors.push(SymbolError {
                        side,
                        index,
                        reason: "empty relation symbol".into(),
                    });
                }
                index += 1;
            }
        }
    }
    errors
}

// ============================================================================
// Memoised sequence evaluation
// ============================================================================

/// Per-request memo over [`GraphProbe::pairs_for_sequence`].
///
/// The cache lives for one engine call and is dropped on return; it holds
/// no locks and borrows the probe for its own lifetime.
pub struct PairCache<'p, P: GraphProbe + ?Sized> {
    probe: &'p P,
    memo: HashMap<Sequence, PairSet>,
}

impl<'p, P: GraphProbe + ?Sized> PairCache<'p, P> {
    /// Wrap a borrowed probe.
    pub fn new(probe: &'p P) -> Self {
        Self { probe, memo: HashMap::new() }
    }

    /// `pairs(seq)`, computed at most once per structural form.
    pub fn pairs(&mut self, seq: &Sequence) -> Result<&PairSet, ProbeError> {
        if !self.memo.contains_key(seq) {
            let computed = self.probe.pairs_for_sequence(seq)?;
            self.memo.insert(seq.clone(), computed);
        }
        Ok(self.memo.get(seq).expect("memoised just above"))
    }

    /// Union of `pairs(seq)` over all `seqs`.
    pub fn union(&mut self, seqs: &[Sequence]) -> Result<PairSet, ProbeError> {
        let mut out = PairSet::default();
        for seq in seqs {
            out.extend(self.pairs(seq)?.iter().cloned());
        }
        Ok(out)
    }
}

// ============================================================================
// Inclusion checking
// ============================================================================

/// Result of deciding one constraint.
///
/// For a symbol-invalid constraint only `name`, `ok`, `type` and `errors`
/// are populated; for an evaluated constraint the count and violation
/// fields are.
#[derive(Clone, Debug, Serialize)]
pub struct InclusionReport {
    /// Constraint name.
    pub name: String,
    /// `true` iff no violating pair exists.
    pub ok: bool,
    /// `"schema_validation"` when symbol validation rejected the constraint.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,
    /// Symbol errors, when any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SymbolError>,
    /// `|⟦LHS⟧|`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lhs_pairs_count: Option<usize>,
    /// `|⟦RHS⟧|`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs_pairs_count: Option<usize>,
    /// Violating pairs, sorted, at most [`VIOLATION_CAP`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Pair>>,
    /// Total number of violating pairs (uncapped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations_count: Option<usize>,
}

/// Decide `LHS ⊆ RHS` for an already-parsed constraint.
pub fn check_parsed<P: GraphProbe + ?Sized>(
    probe: &P,
    rpc: &Rpc,
) -> Result<InclusionReport, ProbeError> {
    let errors = validate_symbols(rpc);
    if !errors.is_empty() {
        return Ok(InclusionReport {
            name: rpc.name.clone(),
            ok: false,
            report_type: Some("schema_validation".into()),
            errors,
            lhs_pairs_count: None,
            rhs_pairs_count: None,
            violations: None,
            violations_count: None,
        });
    }

    let mut cache = PairCache::new(probe);
    let lhs_pairs = cache.union(&expand(&rpc.lhs))?;
    let rhs_pairs = cache.union(&expand(&rpc.rhs))?;

    let mut violations: Vec<Pair> = lhs_pairs
        .iter()
        .filter(|p| !rhs_pairs.contains(*p))
        .cloned()
        .collect();
    violations.sort();
    let violations_count = violations.len();
    violations.truncate(VIOLATION_CAP);

    Ok(InclusionReport {
        name: rpc.name.clone(),
        ok: violations_count == 0,
        report_type: None,
        errors: Vec::new(),
        lhs_pairs_count: Some(lhs_pairs.len()),
        rhs_pairs_count: Some(rhs_pairs.len()),
        violations: Some(violations),
        violations_count: Some(violations_count),
    })
}

/// Parse one constraint string and decide it against `probe`.
///
/// Syntax failures surface as [`EngineError::Syntax`]; a symbol-invalid
/// constraint is *not* an error and comes back as a
/// `type: "schema_validation"` report with `ok: false`.
pub fn check_inclusion<P: GraphProbe + ?Sized>(
    probe: &P,
    raw: &str,
) -> Result<InclusionReport, EngineError> {
    let rpc = parse_rpc(raw)?;
    Ok(check_parsed(probe, &rpc)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Atom, Rpq};
    use crate::probe::{family_graph, MemoryGraph};
    use crate::NodeId;
    use std::cell::Cell;

    fn int_pairs(pairs: &[Pair]) -> Vec<(i64, i64)> {
        pairs
            .iter()
            .map(|(u, v)| match (u, v) {
                (NodeId::Int(a), NodeId::Int(b)) => (*a, *b),
                other => panic!("non-integer pair {other:?}"),
            })
            .collect()
    }

    #[test]
    fn unsatisfied_constraint_lists_sorted_violations() {
        let g = family_graph();
        let report = check_inclusion(&g, "C1 = child_of ⊆ son_of∣daughter_of").unwrap();
        assert_eq!(report.name, "C1");
        assert!(!report.ok);
        assert_eq!(report.lhs_pairs_count, Some(2));
        assert_eq!(report.rhs_pairs_count, Some(0));
        assert_eq!(report.violations_count, Some(2));
        assert_eq!(
            int_pairs(report.violations.as_deref().unwrap()),
            vec![(1, 2), (2, 3)]
        );
    }

    #[test]
    fn grouped_alternation_on_the_lhs() {
        let g = family_graph();
        let report = check_inclusion(
            &g,
            "C2 = child_of.(brother_of∣sister_of) ⊆ nephew_of∣niece_of",
        )
        .unwrap();
        assert!(report.ok);
        assert_eq!(report.lhs_pairs_count, Some(1));
        assert_eq!(report.rhs_pairs_count, Some(1));
        assert_eq!(report.violations, Some(vec![]));
        assert_eq!(report.violations_count, Some(0));
    }

    #[test]
    fn two_hop_inclusion_holds() {
        let g = family_graph();
        let report = check_inclusion(
            &g,
            "C3 = child_of.child_of ⊆ grandson_of∣granddaughter_of",
        )
        .unwrap();
        assert!(report.ok);
        assert_eq!(report.lhs_pairs_count, Some(1));
        assert_eq!(report.rhs_pairs_count, Some(1));
        assert_eq!(report.violations_count, Some(0));
    }

    #[test]
    fn empty_lhs_denotation_always_satisfies() {
        let g = family_graph();
        let report =
            check_inclusion(&g, "C = no_such_label ⊆ also_missing").unwrap();
        assert!(report.ok);
        assert_eq!(report.lhs_pairs_count, Some(0));
    }

    #[test]
    fn textual_superset_rhs_never_violates() {
        let g = family_graph();
        let report = check_inclusion(
            &g,
            "C = child_of∣brother_of ⊆ child_of∣brother_of∣nephew_of",
        )
        .unwrap();
        assert!(report.ok);
        assert_eq!(report.violations_count, Some(0));
    }

    #[test]
    fn violations_are_capped_but_counted_in_full() {
        let mut g = MemoryGraph::new();
        for i in 0..(VIOLATION_CAP as i64 + 50) {
            g.add_edge(i, i + 10_000, "r");
        }
        let report = check_inclusion(&g, "C = r ⊆ s").unwrap();
        assert!(!report.ok);
        assert_eq!(report.violations_count, Some(VIOLATION_CAP + 50));
        assert_eq!(report.violations.as_deref().unwrap().len(), VIOLATION_CAP);
    }

    struct Counting<'g> {
        inner: &'g MemoryGraph,
        calls: Cell<usize>,
    }

    impl GraphProbe for Counting<'_> {
        fn pairs_for_sequence(&self, seq: &Sequence) -> Result<PairSet, ProbeError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.pairs_for_sequence(seq)
        }
        fn witness_path(
            &self,
            seq: &Sequence,
            u: &NodeId,
            v: &NodeId,
        ) -> Result<Option<crate::WitnessPath>, ProbeError> {
            self.inner.witness_path(seq, u, v)
        }
    }

    #[test]
    fn pairs_are_memoised_per_request() {
        let g = family_graph();
        let probe = Counting { inner: &g, calls: Cell::new(0) };
        // The same sequence on both sides must hit the probe once.
        check_inclusion(&probe, "C = child_of ⊆ child_of").unwrap();
        assert_eq!(probe.calls.get(), 1);
    }

    struct Failing;

    impl GraphProbe for Failing {
        fn pairs_for_sequence(&self, _: &Sequence) -> Result<PairSet, ProbeError> {
            Err(ProbeError::Backend("connection reset".into()))
        }
        fn witness_path(
            &self,
            _: &Sequence,
            _: &NodeId,
            _: &NodeId,
        ) -> Result<Option<crate::WitnessPath>, ProbeError> {
            Err(ProbeError::Backend("connection reset".into()))
        }
    }

    #[test]
    fn probe_failures_abort_the_request() {
        let err = check_inclusion(&Failing, "C = a ⊆ b").unwrap_err();
        assert!(matches!(err, EngineError::Probe(ProbeError::Backend(_))));
    }

    #[test]
    fn blank_labels_are_schema_errors() {
        let rpc = Rpc {
            name: "bad".into(),
            lhs: Rpq::from_seqs(vec![Sequence::new(vec![
                Atom::new("ok_label"),
                Atom::new("  "),
            ])]),
            rhs: Rpq::from_seqs(vec![Sequence::new(vec![Atom::new("x")])]),
        };
        let errors = validate_symbols(&rpc);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].side, Side::Lhs);
        assert_eq!(errors[0].index, 1);

        let g = family_graph();
        let report = check_parsed(&g, &rpc).unwrap();
        assert!(!report.ok);
        assert_eq!(report.report_type.as_deref(), Some("schema_validation"));
        assert!(report.lhs_pairs_count.is_none());
    }

    #[test]
    fn syntax_errors_surface_as_engine_errors() {
        let g = family_graph();
        let err = check_inclusion(&g, "Cx = a b c").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Syntax(crate::parser::SyntaxError::Rpc(
                crate::parser::RpcParseError::MissingSubset
            ))
        ));
    }
}
