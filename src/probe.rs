//! Storage-engine interface and the in-memory reference backend
//!
//! The engine never stores or mutates a graph; it drives a borrowed
//! [`GraphProbe`]. The probe answers exactly two questions: which node
//! pairs realise a sequence ([`GraphProbe::pairs_for_sequence`]), and one
//! concrete path evidencing a given pair ([`GraphProbe::witness_path`]).
//! A third operation, [`GraphProbe::violation_sample`], backs the measures
//! engine's fast path; the default implementation evaluates both sides and
//! differences them, and backends with a native anti-join may override it.
//!
//! [`MemoryGraph`] is the bundled backend: a labelled digraph held in
//! forward and reverse per-label adjacency indexes, loadable from a JSON
//! document ([`GraphDoc`]). Sequence evaluation is a hop-by-hop relational
//! join; witness search is a depth-first walk over the forward index.
//! Inverse atoms are honoured for pair evaluation but deliberately yield no
//! witnesses.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::parser::{Atom, Sequence};
use crate::{NodeId, Pair, PairSet, WitnessPath};

/// Failure of the storage backend while answering a probe call.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The backend failed (connection, storage, malformed answer, …).
    #[error("graph backend failure: {0}")]
    Backend(String),
    /// The caller's cancellation token fired; the request is abandoned.
    #[error("probe call cancelled")]
    Cancelled,
}

/// Read-only view of the active graph, as consumed by the engine.
///
/// Implementations must be safe for concurrent reads; the engine holds no
/// locks and may be invoked from several requests sharing one probe.
pub trait GraphProbe {
    /// All pairs `(u, v)` such that `seq` is realised by a directed
    /// labelled path from `u` to `v`. Deduplicated; inverse atoms reverse
    /// the hop direction.
    fn pairs_for_sequence(&self, seq: &Sequence) -> Result<PairSet, ProbeError>;

    /// One concrete path from `u` to `v` conforming to `seq`, or `None`.
    /// May always answer `None` when `seq` contains an inverse atom.
    fn witness_path(
        &self,
        seq: &Sequence,
        u: &NodeId,
        v: &NodeId,
    ) -> Result<Option<WitnessPath>, ProbeError>;

    /// Up to `limit` pairs satisfying some `lhs` sequence but no `rhs`
    /// sequence. An empty answer means the constraint holds.
    ///
    /// The default evaluates each side via [`pairs_for_sequence`] and stops
    /// scanning further LHS alternatives once `limit` pairs are in hand;
    /// the answer is sorted so a given graph always yields the same sample.
    ///
    /// [`pairs_for_sequence`]: GraphProbe::pairs_for_sequence
    fn violation_sample(
        &self,
        lhs: &[Sequence],
        rhs: &[Sequence],
        limit: usize,
    ) -> Result<Vec<Pair>, ProbeError> {
        let mut rhs_pairs = PairSet::default();
        for seq in rhs {
            rhs_pairs.extend(self.pairs_for_sequence(seq)?);
        }
        let mut out: BTreeSet<Pair> = BTreeSet::new();
        for seq in lhs {
            for pair in self.pairs_for_sequence(seq)? {
                if !rhs_pairs.contains(&pair) {
                    out.insert(pair);
                }
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out.into_iter().take(limit).collect())
    }
}

// ============================================================================
// JSON document form
// ============================================================================

/// One node of a [`GraphDoc`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Node identity.
    pub id: NodeId,
    /// Node labels (may be empty).
    #[serde(default)]
    pub labels: Vec<String>,
    /// Free-form properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, serde_json::Value>,
}

/// One edge of a [`GraphDoc`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeDoc {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Relation label.
    pub label: String,
}

/// Serialized form of a graph instance: `{"nodes": […], "edges": […]}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDoc {
    /// Declared nodes. Endpoints mentioned only by edges are registered
    /// implicitly with no labels.
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    /// Edges.
    #[serde(default)]
    pub edges: Vec<EdgeDoc>,
}

// ============================================================================
// In-memory backend
// ============================================================================

type LabelIndex = HashMap<String, BTreeMap<NodeId, Vec<NodeId>>>;

/// Indexed, immutable-after-build labelled digraph.
#[derive(Clone, Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<NodeId, NodeDoc>,
    edges: Vec<EdgeDoc>,
    /// label → source → sorted targets.
    fwd: LabelIndex,
    /// label → target → sorted sources.
    rev: LabelIndex,
}

impl MemoryGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the indexed graph from its document form.
    pub fn from_doc(doc: GraphDoc) -> Self {
        let mut g = Self::new();
        for node in doc.nodes {
            g.nodes.insert(node.id.clone(), node);
        }
        for edge in doc.edges {
            g.add_edge(edge.from, edge.to, &edge.label);
        }
        g
    }

    /// Parse a [`GraphDoc`] from JSON text and build the graph.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        Ok(Self::from_doc(serde_json::from_str(text)?))
    }

    /// Register a node with the given labels.
    pub fn add_node(&mut self, id: impl Into<NodeId>, labels: &[&str]) {
        let id = id.into();
        self.nodes.insert(
            id.clone(),
            NodeDoc {
                id,
                labels: labels.iter().map(|l| l.to_string()).collect(),
                props: BTreeMap::new(),
            },
        );
    }

    /// Add a directed labelled edge, registering unknown endpoints.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>, label: &str) {
        let from = from.into();
        let to = to.into();
        for id in [&from, &to] {
            self.nodes.entry(id.clone()).or_insert_with(|| NodeDoc {
                id: id.clone(),
                labels: Vec::new(),
                props: BTreeMap::new(),
            });
        }
        insert_sorted(
            self.fwd.entry(label.to_owned()).or_default(),
            from.clone(),
            to.clone(),
        );
        insert_sorted(
            self.rev.entry(label.to_owned()).or_default(),
            to.clone(),
            from.clone(),
        );
        self.edges.push(EdgeDoc { from, to, label: label.to_owned() });
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (parallel edges counted individually).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All node labels present, sorted.
    pub fn labels(&self) -> BTreeSet<String> {
        self.nodes
            .values()
            .flat_map(|n| n.labels.iter().cloned())
            .collect()
    }

    /// All relation labels present, sorted.
    pub fn relationship_types(&self) -> BTreeSet<String> {
        self.fwd.keys().cloned().collect()
    }

    /// Registered nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDoc> {
        self.nodes.values()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[EdgeDoc] {
        &self.edges
    }

    /// Successors of `from` along one atom (respecting direction).
    fn step(&self, atom: &Atom, from: &NodeId) -> &[NodeId] {
        let index = if atom.inverse { &self.rev } else { &self.fwd };
        index
            .get(&atom.label)
            .and_then(|m| m.get(from))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All single-hop pairs along one atom.
    fn seed(&self, atom: &Atom) -> PairSet {
        let index = if atom.inverse { &self.rev } else { &self.fwd };
        let mut out = PairSet::default();
        if let Some(adj) = index.get(&atom.label) {
            for (from, tos) in adj {
                for to in tos {
                    out.insert((from.clone(), to.clone()));
                }
            }
        }
        out
    }

    fn find_path(
        &self,
        atoms: &[Atom],
        cur: &NodeId,
        target: &NodeId,
        acc: &mut WitnessPath,
    ) -> bool {
        match atoms.split_first() {
            None => cur == target,
            Some((atom, rest)) => {
                for next in self.step(atom, cur) {
                    acc.push((cur.clone(), next.clone(), atom.label.clone()));
                    if self.find_path(rest, next, target, acc) {
                        return true;
                    }
                    acc.pop();
                }
                false
            }
        }
    }
}

fn insert_sorted(adj: &mut BTreeMap<NodeId, Vec<NodeId>>, key: NodeId, value: NodeId) {
    let slot = adj.entry(key).or_default();
    if let Err(at) = slot.binary_search(&value) {
        slot.insert(at, value);
    }
}

impl GraphProbe for MemoryGraph {
    fn pairs_for_sequence(&self, seq: &Sequence) -> Result<PairSet, ProbeError> {
        let atoms = seq.atoms();
        let Some((first, rest)) = atoms.split_first() else {
            return Ok(PairSet::default());
        };
        let mut cur = self.seed(first);
        for atom in rest {
            let mut next = PairSet::default();
            for (u, x) in &cur {
                for w in self.step(atom, x) {
                    next.insert((u.clone(), w.clone()));
                }
            }
            cur = next;
            if cur.is_empty() {
                break;
            }
        }
        Ok(cur)
    }

    fn witness_path(
        &self,
        seq: &Sequence,
        u: &NodeId,
        v: &NodeId,
    ) -> Result<Option<WitnessPath>, ProbeError> {
        if seq.is_empty() || seq.has_inverse() {
            return Ok(None);
        }
        let mut path = WitnessPath::new();
        if self.find_path(seq.atoms(), u, v, &mut path) {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

/// The family graph used across the engine's scenario tests.
#[cfg(test)]
pub(crate) fn family_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    g.add_node(1, &["Person"]); // Alice
    g.add_node(2, &["Person"]); // Bob
    g.add_node(3, &["Person"]); // Carol
    g.add_node(4, &["Person"]); // Dan
    g.add_edge(1, 2, "child_of");
    g.add_edge(2, 3, "child_of");
    g.add_edge(1, 3, "grandson_of");
    g.add_edge(2, 4, "brother_of");
    g.add_edge(1, 4, "nephew_of");
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rpq;

    fn seq(text: &str) -> Sequence {
        parse_rpq(text).unwrap().sequences()[0].clone()
    }

    fn pairs(g: &MemoryGraph, text: &str) -> Vec<(i64, i64)> {
        let mut v: Vec<(i64, i64)> = g
            .pairs_for_sequence(&seq(text))
            .unwrap()
            .into_iter()
            .map(|(u, v)| match (u, v) {
                (NodeId::Int(a), NodeId::Int(b)) => (a, b),
                other => panic!("non-integer pair {other:?}"),
            })
            .collect();
        v.sort();
        v
    }

    #[test]
    fn single_hop_pairs() {
        let g = family_graph();
        assert_eq!(pairs(&g, "child_of"), vec![(1, 2), (2, 3)]);
        assert_eq!(pairs(&g, "unknown_label"), vec![]);
    }

    #[test]
    fn multi_hop_join() {
        let g = family_graph();
        assert_eq!(pairs(&g, "child_of.child_of"), vec![(1, 3)]);
        assert_eq!(pairs(&g, "child_of.brother_of"), vec![(1, 4)]);
        assert_eq!(pairs(&g, "child_of.child_of.child_of"), vec![]);
    }

    #[test]
    fn inverse_atoms_reverse_direction() {
        let g = family_graph();
        assert_eq!(pairs(&g, "^child_of"), vec![(2, 1), (3, 2)]);
        // Mixed: 3 -^child_of-> 2 -brother_of-> 4.
        assert_eq!(pairs(&g, "^child_of.brother_of"), vec![(3, 4)]);
    }

    #[test]
    fn parallel_paths_deduplicate() {
        let mut g = MemoryGraph::new();
        g.add_edge(1, 2, "r");
        g.add_edge(1, 3, "r");
        g.add_edge(2, 4, "s");
        g.add_edge(3, 4, "s");
        // Two distinct r.s paths, one pair.
        assert_eq!(pairs(&g, "r.s"), vec![(1, 4)]);
    }

    #[test]
    fn witness_path_walks_the_forward_index() {
        let g = family_graph();
        let got = g
            .witness_path(&seq("child_of.child_of"), &NodeId::Int(1), &NodeId::Int(3))
            .unwrap()
            .unwrap();
        assert_eq!(
            got,
            vec![
                (NodeId::Int(1), NodeId::Int(2), "child_of".into()),
                (NodeId::Int(2), NodeId::Int(3), "child_of".into()),
            ]
        );
    }

    #[test]
    fn witness_path_absences() {
        let g = family_graph();
        // No conforming path.
        assert_eq!(
            g.witness_path(&seq("child_of"), &NodeId::Int(1), &NodeId::Int(3))
                .unwrap(),
            None
        );
        // Inverse atoms never witness.
        assert_eq!(
            g.witness_path(&seq("^child_of"), &NodeId::Int(2), &NodeId::Int(1))
                .unwrap(),
            None
        );
    }

    #[test]
    fn violation_sample_respects_limit_and_order() {
        let g = family_graph();
        let lhs = vec![seq("child_of")];
        let rhs = vec![seq("son_of")];
        let full = g.violation_sample(&lhs, &rhs, 20).unwrap();
        assert_eq!(
            full,
            vec![
                (NodeId::Int(1), NodeId::Int(2)),
                (NodeId::Int(2), NodeId::Int(3)),
            ]
        );
        let capped = g.violation_sample(&lhs, &rhs, 1).unwrap();
        assert_eq!(capped, vec![(NodeId::Int(1), NodeId::Int(2))]);
        // Satisfied constraint: empty sample.
        let none = g
            .violation_sample(&[seq("child_of")], &[seq("child_of")], 20)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn json_document_round_trip() {
        let text = r#"{
            "nodes": [
                {"id": 1, "labels": ["Person"], "props": {"name": "Alice"}},
                {"id": "ext-7", "labels": []}
            ],
            "edges": [
                {"from": 1, "to": "ext-7", "label": "knows"}
            ]
        }"#;
        let g = MemoryGraph::from_json(text).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(
            g.relationship_types().into_iter().collect::<Vec<_>>(),
            vec!["knows"]
        );
        assert_eq!(
            pairs_of(&g, "knows"),
            vec![(NodeId::Int(1), NodeId::Text("ext-7".into()))]
        );

        fn pairs_of(g: &MemoryGraph, label: &str) -> Vec<Pair> {
            let mut v: Vec<Pair> = g
                .pairs_for_sequence(&Sequence::new(vec![Atom::new(label)]))
                .unwrap()
                .into_iter()
                .collect();
            v.sort();
            v
        }
    }

    #[test]
    fn implicit_endpoints_and_schema() {
        let mut g = MemoryGraph::new();
        g.add_node(1, &["Person"]);
        g.add_edge(1, 2, "knows");
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.labels().into_iter().collect::<Vec<_>>(), vec!["Person"]);
    }
}
