//! Inconsistency measures over a set of regular path constraints
//!
//! Given constraint strings and a set of requested measure names, the
//! engine produces a summary map plus per-constraint details. Two
//! strategies are used:
//!
//! - **Fast path** — taken when every requested measure is one of
//!   `mu_drastic`, `mu_violated_constraints`, `problematic_pairs`. Each
//!   constraint is decided by a single [`GraphProbe::violation_sample`]
//!   call; at most [`FAST_SAMPLE_CAP`] violating pairs are sampled per
//!   constraint, so `problematic_pairs` reports the cardinality of the
//!   union of samples — a *lower bound*, not an exact count. Callers that
//!   need exactness request any advanced measure, which forces the slow
//!   path.
//! - **Slow path** — full pair-set evaluation per constraint through the
//!   shared [`PairCache`], followed by witness-path extraction and the
//!   minimality and cover computations.
//!
//! Failure semantics: a parse error on any constraint aborts the whole
//! call, as does any probe failure. A constraint that fails symbol
//! validation is reported in-band, counts as violated for `mu_drastic` and
//! `mu_violated_constraints`, and contributes nothing to the pair-derived
//! measures.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::eval::{expand, validate_symbols, PairCache, SymbolError};
use crate::parser::{parse_rpc, Rpc};
use crate::probe::{GraphProbe, ProbeError};
use crate::{Edge, EngineError, NodeId, Pair, WitnessPath};

/// Per-constraint cap on sampled violating pairs in fast mode.
pub const FAST_SAMPLE_CAP: usize = 20;

// ============================================================================
// Measure names
// ============================================================================

/// The inconsistency measures the engine can compute.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MeasureName {
    /// `I_B`: 1 if any constraint is violated, else 0.
    #[serde(rename = "mu_drastic")]
    MuDrastic,
    /// `I_C`: number of violated constraints.
    #[serde(rename = "mu_violated_constraints")]
    MuViolatedConstraints,
    /// `I_P`: number of distinct violating pairs across constraints.
    #[serde(rename = "problematic_pairs")]
    ProblematicPairs,
    /// `I_E`: distinct edges appearing in any witness path.
    #[serde(rename = "problematic_edges")]
    ProblematicEdges,
    /// `I_L`: distinct labels over the problematic edges.
    #[serde(rename = "problematic_labels")]
    ProblematicLabels,
    /// `I_V`: distinct endpoints over the problematic edges.
    #[serde(rename = "problematic_vertices")]
    ProblematicVertices,
    /// `I_M`: witness edge-sets minimal w.r.t. strict inclusion.
    #[serde(rename = "minimal_problematic_graphs")]
    MinimalProblematicGraphs,
    /// `I_S`: witness paths with no strictly smaller witness inside them.
    #[serde(rename = "minimal_problematic_paths")]
    MinimalProblematicPaths,
    /// `I_E⁻`: repair-size surrogate, equal to `I_M`.
    #[serde(rename = "I_E_minus")]
    IEMinus,
    /// `I_E⁺`: repair-size surrogate, equal to `I_P`.
    #[serde(rename = "I_E_plus")]
    IEPlus,
    /// `I_V⁻`: greedy vertex-cover size over the problematic pairs.
    #[serde(rename = "I_V_minus")]
    IVMinus,
}

impl MeasureName {
    /// Every measure, in canonical order.
    pub const ALL: [MeasureName; 11] = [
        MeasureName::MuDrastic,
        MeasureName::MuViolatedConstraints,
        MeasureName::ProblematicPairs,
        MeasureName::ProblematicEdges,
        MeasureName::ProblematicLabels,
        MeasureName::ProblematicVertices,
        MeasureName::MinimalProblematicGraphs,
        MeasureName::MinimalProblematicPaths,
        MeasureName::IEMinus,
        MeasureName::IEPlus,
        MeasureName::IVMinus,
    ];

    /// Wire name of the measure.
    pub fn as_str(self) -> &'static str {
        match self {
            MeasureName::MuDrastic => "mu_drastic",
            MeasureName::MuViolatedConstraints => "mu_violated_constraints",
            MeasureName::ProblematicPairs => "problematic_pairs",
            MeasureName::ProblematicEdges => "problematic_edges",
            MeasureName::ProblematicLabels => "problematic_labels",
            MeasureName::ProblematicVertices => "problematic_vertices",
            MeasureName::MinimalProblematicGraphs => "minimal_problematic_graphs",
            MeasureName::MinimalProblematicPaths => "minimal_problematic_paths",
            MeasureName::IEMinus => "I_E_minus",
            MeasureName::IEPlus => "I_E_plus",
            MeasureName::IVMinus => "I_V_minus",
        }
    }

    /// `true` for the measures the sampling fast path can serve.
    fn fast_path_eligible(self) -> bool {
        matches!(
            self,
            MeasureName::MuDrastic
                | MeasureName::MuViolatedConstraints
                | MeasureName::ProblematicPairs
        )
    }
}

impl fmt::Display for MeasureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasureName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasureName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown measure name '{s}'"))
    }
}

// ============================================================================
// Result shapes
// ============================================================================

/// One constraint's entry in the details map.
///
/// Fast-mode reports carry only `name` and `ok`; slow-mode reports add the
/// pair counts; symbol-invalid constraints carry `type` and `errors`
/// instead.
#[derive(Clone, Debug, Serialize)]
pub struct ConstraintReport {
    /// Constraint name.
    pub name: String,
    /// `true` iff the constraint holds.
    pub ok: bool,
    /// `|⟦LHS⟧|` (slow path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lhs_pairs: Option<usize>,
    /// `|⟦RHS⟧|` (slow path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs_pairs: Option<usize>,
    /// Number of violating pairs (slow path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations_count: Option<usize>,
    /// `"schema_validation"` when symbol validation rejected the constraint.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,
    /// Symbol errors, when any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SymbolError>,
}

impl ConstraintReport {
    fn verdict(name: &str, ok: bool) -> Self {
        ConstraintReport {
            name: name.to_owned(),
            ok,
            lhs_pairs: None,
            rhs_pairs: None,
            violations_count: None,
            report_type: None,
            errors: Vec::new(),
        }
    }

    fn schema_invalid(name: &str, errors: Vec<SymbolError>) -> Self {
        ConstraintReport {
            name: name.to_owned(),
            ok: false,
            lhs_pairs: None,
            rhs_pairs: None,
            violations_count: None,
            report_type: Some("schema_validation".into()),
            errors,
        }
    }
}

/// Supporting detail for a measures computation.
#[derive(Clone, Debug, Serialize)]
pub struct MeasuresDetails {
    /// One report per input constraint, in input order.
    pub per_constraint: Vec<ConstraintReport>,
    /// All violating pairs, sorted (slow path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<Pair>>,
    /// Minimal witness edge-sets (slow path only).
    #[serde(rename = "MIMS", skip_serializing_if = "Option::is_none")]
    pub mims: Option<Vec<Vec<Edge>>>,
    /// Minimal witness paths (slow path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal_paths: Option<Vec<WitnessPath>>,
}

/// Summary and details for one measures computation.
#[derive(Clone, Debug, Serialize)]
pub struct MeasuresOutcome {
    /// Exactly the requested measures.
    pub summary: BTreeMap<MeasureName, u64>,
    /// Per-constraint reports and (slow path) supporting sets.
    pub details: MeasuresDetails,
}

// ============================================================================
// Engine entry points
// ============================================================================

/// Parse `constraints` and compute the `requested` measures against `probe`.
pub fn compute_measures<P: GraphProbe + ?Sized>(
    probe: &P,
    constraints: &[String],
    requested: &[MeasureName],
) -> Result<MeasuresOutcome, EngineError> {
    let mut parsed = Vec::with_capacity(constraints.len());
    for raw in constraints {
        parsed.push(parse_rpc(raw)?);
    }
    Ok(compute_measures_parsed(probe, &parsed, requested)?)
}

/// As [`compute_measures`], over already-parsed constraints.
pub fn compute_measures_parsed<P: GraphProbe + ?Sized>(
    probe: &P,
    constraints: &[Rpc],
    requested: &[MeasureName],
) -> Result<MeasuresOutcome, ProbeError> {
    if requested.iter().all(|m| m.fast_path_eligible()) {
        fast_path(probe, constraints, requested)
    } else {
        slow_path(probe, constraints, requested)
    }
}

fn fast_path<P: GraphProbe + ?Sized>(
    probe: &P,
    constraints: &[Rpc],
    requested: &[MeasureName],
) -> Result<MeasuresOutcome, ProbeError> {
    let want_pairs = requested.contains(&MeasureName::ProblematicPairs);
    let cap = if want_pairs { FAST_SAMPLE_CAP } else { 1 };

    let mut violated = 0u64;
    let mut sampled: BTreeSet<Pair> = BTreeSet::new();
    let mut per_constraint = Vec::with_capacity(constraints.len());

    for rpc in constraints {
        let errors = validate_symbols(rpc);
        if !errors.is_empty() {
            violated += 1;
            per_constraint.push(ConstraintReport::schema_invalid(&rpc.name, errors));
            continue;
        }
        let lhs = expand(&rpc.lhs);
        let rhs = expand(&rpc.rhs);
        let sample = probe.violation_sample(&lhs, &rhs, cap)?;
        let ok = sample.is_empty();
        if !ok {
            violated += 1;
            sampled.extend(sample);
        }
        per_constraint.push(ConstraintReport::verdict(&rpc.name, ok));
    }

    let mut summary = BTreeMap::new();
    for m in requested {
        let value = match m {
            MeasureName::MuDrastic => u64::from(violated > 0),
            MeasureName::MuViolatedConstraints => violated,
            MeasureName::ProblematicPairs => sampled.len() as u64,
            _ => unreachable!("fast path only serves fast-eligible measures"),
        };
        summary.insert(*m, value);
    }

    Ok(MeasuresOutcome {
        summary,
        details: MeasuresDetails {
            per_constraint,
            pairs: None,
            mims: None,
            minimal_paths: None,
        },
    })
}

fn slow_path<P: GraphProbe + ?Sized>(
    probe: &P,
    constraints: &[Rpc],
    requested: &[MeasureName],
) -> Result<MeasuresOutcome, ProbeError> {
    let mut cache = PairCache::new(probe);

    let mut violated = 0u64;
    let mut problem_pairs: BTreeSet<Pair> = BTreeSet::new();
    let mut witnessed: HashSet<Pair> = HashSet::new();
    let mut witness_paths: Vec<WitnessPath> = Vec::new();
    let mut per_constraint = Vec::with_capacity(constraints.len());

    for rpc in constraints {
        let errors = validate_symbols(rpc);
        if !errors.is_empty() {
            violated += 1;
            per_constraint.push(ConstraintReport::schema_invalid(&rpc.name, errors));
            continue;
        }

        let lhs_seqs = expand(&rpc.lhs);
        let lhs_pairs = cache.union(&lhs_seqs)?;
        let rhs_pairs = cache.union(&expand(&rpc.rhs))?;

        // Sorted so probe calls and witness collection are reproducible.
        let violations: BTreeSet<Pair> = lhs_pairs
            .iter()
            .filter(|p| !rhs_pairs.contains(*p))
            .cloned()
            .collect();
        let ok = violations.is_empty();

        if !ok {
            violated += 1;
            for pair in &violations {
                problem_pairs.insert(pair.clone());
                if witnessed.contains(pair) {
                    continue;
                }
                for seq in &lhs_seqs {
                    if let Some(path) = probe.witness_path(seq, &pair.0, &pair.1)? {
                        if !path.is_empty() {
                            witness_paths.push(path);
                            witnessed.insert(pair.clone());
                            break;
                        }
                    }
                }
            }
        }

        per_constraint.push(ConstraintReport {
            name: rpc.name.clone(),
            ok,
            lhs_pairs: Some(lhs_pairs.len()),
            rhs_pairs: Some(rhs_pairs.len()),
            violations_count: Some(violations.len()),
            report_type: None,
            errors: Vec::new(),
        });
    }

    // Witness-derived sets.
    let path_sets: Vec<BTreeSet<Edge>> = witness_paths
        .iter()
        .map(|p| p.iter().cloned().collect())
        .collect();
    let minimal_sets = minimal_edge_sets(&path_sets);
    let minimal_path_idx = minimal_path_indexes(&witness_paths, &path_sets);

    let mut prob_edges: BTreeSet<Edge> = BTreeSet::new();
    for set in &path_sets {
        prob_edges.extend(set.iter().cloned());
    }
    let prob_labels: BTreeSet<&str> =
        prob_edges.iter().map(|(_, _, label)| label.as_str()).collect();
    let mut prob_vertices: BTreeSet<&NodeId> = BTreeSet::new();
    for (u, v, _) in &prob_edges {
        prob_vertices.insert(u);
        prob_vertices.insert(v);
    }

    let i_m = minimal_sets.len() as u64;
    let i_s = minimal_path_idx.len() as u64;
    let i_p = problem_pairs.len() as u64;
    let cover = greedy_vertex_cover(&problem_pairs);

    let mut summary = BTreeMap::new();
    for m in requested {
        let value = match m {
            MeasureName::MuDrastic => u64::from(violated > 0),
            MeasureName::MuViolatedConstraints => violated,
            MeasureName::ProblematicPairs => i_p,
            MeasureName::ProblematicEdges => prob_edges.len() as u64,
            MeasureName::ProblematicLabels => prob_labels.len() as u64,
            MeasureName::ProblematicVertices => prob_vertices.len() as u64,
            MeasureName::MinimalProblematicGraphs => i_m,
            MeasureName::MinimalProblematicPaths => i_s,
            MeasureName::IEMinus => i_m,
            MeasureName::IEPlus => i_p,
            MeasureName::IVMinus => cover,
        };
        summary.insert(*m, value);
    }

    Ok(MeasuresOutcome {
        summary,
        details: MeasuresDetails {
            per_constraint,
            pairs: Some(problem_pairs.into_iter().collect()),
            mims: Some(
                minimal_sets
                    .into_iter()
                    .map(|s| s.into_iter().collect())
                    .collect(),
            ),
            minimal_paths: Some(
                minimal_path_idx
                    .into_iter()
                    .map(|i| witness_paths[i].clone())
                    .collect(),
            ),
        },
    })
}

// ============================================================================
// Minimality and cover
// ============================================================================

/// Edge-sets minimal w.r.t. strict inclusion among `sets`.
///
/// `Eᵢ` is minimal iff no other collected set is a proper subset of it;
/// equal sets do not disqualify each other.
fn minimal_edge_sets(sets: &[BTreeSet<Edge>]) -> Vec<BTreeSet<Edge>> {
    let mut out = Vec::new();
    for (i, candidate) in sets.iter().enumerate() {
        let dominated = sets.iter().enumerate().any(|(j, other)| {
            j != i && other.len() < candidate.len() && other.is_subset(candidate)
        });
        if !dominated {
            out.push(candidate.clone());
        }
    }
    out
}

/// Indexes of witness paths with no strictly smaller witness inside them.
///
/// `Wᵢ` is minimal iff there is no `Wⱼ` (`j ≠ i`) whose edge-set is a
/// proper subset of `Wᵢ`'s with `|Wⱼ| < |Wᵢ|`.
fn minimal_path_indexes(
    paths: &[WitnessPath],
    sets: &[BTreeSet<Edge>],
) -> Vec<usize> {
    let mut out = Vec::new();
    for i in 0..paths.len() {
        let dominated = (0..paths.len()).any(|j| {
            j != i
                && paths[j].len() < paths[i].len()
                && sets[j].len() < sets[i].len()
                && sets[j].is_subset(&sets[i])
        });
        if !dominated {
            out.push(i);
        }
    }
    out
}

/// Greedy vertex cover over the problematic-pairs graph.
///
/// Repeatedly removes the vertex incident to the most remaining pairs
/// (frequency ties broken by the smallest vertex) until no pair remains.
fn greedy_vertex_cover(pairs: &BTreeSet<Pair>) -> u64 {
    let mut remaining: Vec<Pair> = pairs.iter().cloned().collect();
    let mut cover = 0u64;
    while !remaining.is_empty() {
        let mut freq: BTreeMap<&NodeId, usize> = BTreeMap::new();
        for (u, v) in &remaining {
            *freq.entry(u).or_default() += 1;
            *freq.entry(v).or_default() += 1;
        }
        let mut best: Option<(&NodeId, usize)> = None;
        for (node, count) in freq {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((node, count));
            }
        }
        let chosen = best.expect("non-empty pair set has a vertex").0.clone();
        cover += 1;
        remaining.retain(|(u, v)| *u != chosen && *v != chosen);
    }
    cover
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Atom, Rpq, Sequence};
    use crate::probe::family_graph;

    fn family_constraints() -> Vec<String> {
        vec![
            "C1 = child_of ⊆ son_of∣daughter_of".into(),
            "C2 = child_of.(brother_of∣sister_of) ⊆ nephew_of∣niece_of".into(),
            "C3 = child_of.child_of ⊆ grandson_of∣granddaughter_of".into(),
        ]
    }

    fn get(outcome: &MeasuresOutcome, m: MeasureName) -> u64 {
        *outcome.summary.get(&m).expect("requested measure present")
    }

    #[test]
    fn fast_path_summary() {
        let g = family_graph();
        let requested = [
            MeasureName::MuDrastic,
            MeasureName::MuViolatedConstraints,
            MeasureName::ProblematicPairs,
        ];
        let out = compute_measures(
            &g,
            &["C1 = child_of ⊆ son_of∣daughter_of".to_string()],
            &requested,
        )
        .unwrap();
        assert_eq!(get(&out, MeasureName::MuDrastic), 1);
        assert_eq!(get(&out, MeasureName::MuViolatedConstraints), 1);
        assert_eq!(get(&out, MeasureName::ProblematicPairs), 2);
        assert_eq!(out.summary.len(), 3);
        // Fast mode carries verdicts only: no counts, no supporting sets.
        assert!(out.details.pairs.is_none());
        assert!(out.details.mims.is_none());
        assert!(out.details.per_constraint[0].lhs_pairs.is_none());
    }

    #[test]
    fn full_battery_on_the_family_graph() {
        let g = family_graph();
        let out = compute_measures(&g, &family_constraints(), &MeasureName::ALL).unwrap();
        assert_eq!(get(&out, MeasureName::MuDrastic), 1);
        assert_eq!(get(&out, MeasureName::MuViolatedConstraints), 1);
        assert_eq!(get(&out, MeasureName::ProblematicPairs), 2);
        assert_eq!(get(&out, MeasureName::ProblematicEdges), 2);
        assert_eq!(get(&out, MeasureName::ProblematicLabels), 1);
        assert_eq!(get(&out, MeasureName::ProblematicVertices), 3);
        assert_eq!(get(&out, MeasureName::MinimalProblematicGraphs), 2);
        assert_eq!(get(&out, MeasureName::MinimalProblematicPaths), 2);
        assert_eq!(get(&out, MeasureName::IEMinus), 2);
        assert_eq!(get(&out, MeasureName::IEPlus), 2);
        // Vertex 2 covers both (1,2) and (2,3).
        assert_eq!(get(&out, MeasureName::IVMinus), 1);

        let reports = &out.details.per_constraint;
        assert_eq!(reports.len(), 3);
        assert!(!reports[0].ok);
        assert!(reports[1].ok && reports[2].ok);
        assert_eq!(reports[0].violations_count, Some(2));
        assert_eq!(out.details.pairs.as_deref().unwrap().len(), 2);
        assert_eq!(out.details.mims.as_deref().unwrap().len(), 2);
        assert_eq!(out.details.minimal_paths.as_deref().unwrap().len(), 2);
    }

    #[test]
    fn fast_and_slow_agree_on_the_shared_measures() {
        let g = family_graph();
        let constraints = family_constraints();
        let fast = compute_measures(
            &g,
            &constraints,
            &[MeasureName::MuDrastic, MeasureName::MuViolatedConstraints],
        )
        .unwrap();
        let slow = compute_measures(&g, &constraints, &MeasureName::ALL).unwrap();
        for m in [MeasureName::MuDrastic, MeasureName::MuViolatedConstraints] {
            assert_eq!(get(&fast, m), get(&slow, m));
        }
    }

    #[test]
    fn shared_pairs_witness_once_across_constraints() {
        let g = family_graph();
        // Both constraints are violated at exactly the same pairs.
        let constraints = vec![
            "A = child_of ⊆ son_of".to_string(),
            "B = child_of ⊆ daughter_of".to_string(),
        ];
        let out = compute_measures(&g, &constraints, &MeasureName::ALL).unwrap();
        assert_eq!(get(&out, MeasureName::MuViolatedConstraints), 2);
        assert_eq!(get(&out, MeasureName::ProblematicPairs), 2);
        // One witness per pair, not per (constraint, pair).
        assert_eq!(get(&out, MeasureName::MinimalProblematicPaths), 2);
        assert_eq!(get(&out, MeasureName::ProblematicEdges), 2);
    }

    #[test]
    fn parse_errors_abort_the_whole_call() {
        let g = family_graph();
        let constraints = vec![
            "C1 = child_of ⊆ son_of".to_string(),
            "not a constraint".to_string(),
        ];
        let err = compute_measures(&g, &constraints, &MeasureName::ALL).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn symbol_invalid_constraints_count_as_violated_without_pairs() {
        let g = family_graph();
        let bad = Rpc {
            name: "bad".into(),
            lhs: Rpq::from_seqs(vec![Sequence::new(vec![Atom::new(" ")])]),
            rhs: Rpq::from_seqs(vec![Sequence::new(vec![Atom::new("x")])]),
        };
        let out = compute_measures_parsed(&g, &[bad], &MeasureName::ALL).unwrap();
        assert_eq!(get(&out, MeasureName::MuDrastic), 1);
        assert_eq!(get(&out, MeasureName::MuViolatedConstraints), 1);
        assert_eq!(get(&out, MeasureName::ProblematicPairs), 0);
        let report = &out.details.per_constraint[0];
        assert_eq!(report.report_type.as_deref(), Some("schema_validation"));
        assert!(!report.ok);
    }

    fn edge(u: i64, v: i64, label: &str) -> Edge {
        (NodeId::Int(u), NodeId::Int(v), label.to_owned())
    }

    #[test]
    fn edge_set_minimality_and_idempotence() {
        let small: WitnessPath = vec![edge(1, 2, "r")];
        let large: WitnessPath = vec![edge(1, 2, "r"), edge(2, 3, "r")];
        let sets: Vec<BTreeSet<Edge>> = [&small, &large]
            .iter()
            .map(|p| p.iter().cloned().collect())
            .collect();
        let minimal = minimal_edge_sets(&sets);
        assert_eq!(minimal.len(), 1);
        assert_eq!(minimal[0].len(), 1);

        // Dropping the non-minimal set does not change the count.
        let only_small = minimal_edge_sets(&sets[..1]);
        assert_eq!(only_small.len(), minimal.len());

        // Equal sets do not disqualify each other.
        let twins = vec![sets[0].clone(), sets[0].clone()];
        assert_eq!(minimal_edge_sets(&twins).len(), 2);
    }

    #[test]
    fn path_minimality_requires_strictly_smaller_subsets() {
        let small: WitnessPath = vec![edge(1, 2, "r")];
        let large: WitnessPath = vec![edge(1, 2, "r"), edge(2, 3, "r")];
        let incomparable: WitnessPath = vec![edge(7, 8, "s"), edge(8, 9, "s")];
        let paths = vec![small, large, incomparable];
        let sets: Vec<BTreeSet<Edge>> =
            paths.iter().map(|p| p.iter().cloned().collect()).collect();
        let minimal = minimal_path_indexes(&paths, &sets);
        // `large` contains `small`; `incomparable` shares nothing.
        assert_eq!(minimal, vec![0, 2]);
    }

    #[test]
    fn greedy_cover_prefers_high_frequency_vertices() {
        let pairs = |ps: &[(i64, i64)]| -> BTreeSet<Pair> {
            ps.iter()
                .map(|(u, v)| (NodeId::Int(*u), NodeId::Int(*v)))
                .collect()
        };
        assert_eq!(greedy_vertex_cover(&pairs(&[(1, 2), (2, 3)])), 1);
        assert_eq!(greedy_vertex_cover(&pairs(&[(1, 2), (1, 3), (1, 4)])), 1);
        assert_eq!(greedy_vertex_cover(&pairs(&[(1, 2), (3, 4)])), 2);
        assert_eq!(greedy_vertex_cover(&BTreeSet::new()), 0);
    }
}
