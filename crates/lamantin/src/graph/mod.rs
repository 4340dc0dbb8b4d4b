use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// A caller-supplied vertex key (integer, string, or any other hashable value).
pub trait NodeId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> NodeId for T {}

/// A position: exactly `dim` coordinates.
pub type Position = Vec<f64>;

/// Node positions keyed by id, in the order the graph listed its nodes.
pub type PositionMap<N> = IndexMap<N, Position>;

/// The capability set every layout algorithm consumes.
///
/// Node order is significant: it fixes the row order of every internal matrix and therefore the
/// sequence of random draws, which is what makes seeded layouts reproducible.
pub trait LayoutGraph {
    type Node: NodeId;

    fn nodes(&self) -> Vec<Self::Node>;

    fn edges(&self) -> Vec<(Self::Node, Self::Node)>;

    /// Numeric attribute `attr` of the edge between `source` and `target`, if any.
    fn edge_weight(&self, _source: &Self::Node, _target: &Self::Node, _attr: &str) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Edge<N> {
    pub source: N,
    pub target: N,
    pub attrs: FxHashMap<String, f64>,
}

/// Undirected graph with numeric edge attributes.
///
/// Adding an edge inserts its endpoints. Parallel edges are stored as given; layouts collapse
/// them into one.
#[derive(Debug, Clone)]
pub struct Graph<N: NodeId> {
    nodes: IndexSet<N, FxBuildHasher>,
    edges: Vec<Edge<N>>,
    // Latest edge index per (source, target) pair.
    edge_index: FxHashMap<(N, N), usize>,
}

impl<N: NodeId> Default for Graph<N> {
    fn default() -> Self {
        Self {
            nodes: IndexSet::default(),
            edges: Vec::new(),
            edge_index: FxHashMap::default(),
        }
    }
}

impl<N: NodeId> Graph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(edges: impl IntoIterator<Item = (N, N)>) -> Self {
        let mut g = Self::new();
        for (u, v) in edges {
            g.add_edge(u, v);
        }
        g
    }

    pub fn add_node(&mut self, id: N) {
        self.nodes.insert(id);
    }

    pub fn add_edge(&mut self, source: N, target: N) {
        self.push_edge(source, target, FxHashMap::default());
    }

    pub fn add_weighted_edge(&mut self, source: N, target: N, attr: &str, value: f64) {
        let mut attrs = FxHashMap::default();
        attrs.insert(attr.to_string(), value);
        self.push_edge(source, target, attrs);
    }

    fn push_edge(&mut self, source: N, target: N, attrs: FxHashMap<String, f64>) {
        self.nodes.insert(source.clone());
        self.nodes.insert(target.clone());
        self.edge_index
            .insert((source.clone(), target.clone()), self.edges.len());
        self.edges.push(Edge {
            source,
            target,
            attrs,
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_list(&self) -> &[Edge<N>] {
        &self.edges
    }

    fn find_edge(&self, u: &N, v: &N) -> Option<&Edge<N>> {
        let forward = self.edge_index.get(&(u.clone(), v.clone()));
        let backward = self.edge_index.get(&(v.clone(), u.clone()));
        let idx = match (forward, backward) {
            (Some(&a), Some(&b)) => a.max(b),
            (Some(&a), None) | (None, Some(&a)) => a,
            (None, None) => return None,
        };
        self.edges.get(idx)
    }
}

impl<N: NodeId> LayoutGraph for Graph<N> {
    type Node = N;

    fn nodes(&self) -> Vec<N> {
        self.nodes.iter().cloned().collect()
    }

    fn edges(&self) -> Vec<(N, N)> {
        self.edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect()
    }

    fn edge_weight(&self, source: &N, target: &N, attr: &str) -> Option<f64> {
        self.find_edge(source, target)?.attrs.get(attr).copied()
    }
}

/// Adapter for a bare node sequence: no edges.
#[derive(Debug, Clone, Copy)]
pub struct NodeList<'a, N>(pub &'a [N]);

impl<N: NodeId> LayoutGraph for NodeList<'_, N> {
    type Node = N;

    fn nodes(&self) -> Vec<N> {
        self.0.to_vec()
    }

    fn edges(&self) -> Vec<(N, N)> {
        Vec::new()
    }
}

impl<'a, N> From<&'a [N]> for NodeList<'a, N> {
    fn from(nodes: &'a [N]) -> Self {
        Self(nodes)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutStats {
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether a convergence check ended the run before its iteration cap.
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct LayoutResult<N> {
    pub positions: PositionMap<N>,
    pub stats: LayoutStats,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Index-based view of a [`LayoutGraph`], built once per call.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedGraph<N> {
    pub nodes: Vec<N>,
    /// Deduplicated edges without self-loops, in first-seen order and orientation.
    pub edges: Vec<ResolvedEdge>,
    /// Degree counting parallel edges once and self-loops twice.
    pub degree: Vec<usize>,
}

impl<N: NodeId> ResolvedGraph<N> {
    pub fn from_graph<G>(graph: &G, weight_attr: Option<&str>) -> Result<Self>
    where
        G: LayoutGraph<Node = N> + ?Sized,
    {
        let nodes: IndexSet<N, FxBuildHasher> = graph.nodes().into_iter().collect();

        // Keyed by the unordered pair; keeps the first-seen orientation and the last weight.
        let mut merged: IndexMap<(usize, usize), ResolvedEdge, FxBuildHasher> =
            IndexMap::default();
        for (u, v) in graph.edges() {
            let Some(a) = nodes.get_index_of(&u) else {
                return Err(Error::MissingEndpoint {
                    node: format!("{u:?}"),
                });
            };
            let Some(b) = nodes.get_index_of(&v) else {
                return Err(Error::MissingEndpoint {
                    node: format!("{v:?}"),
                });
            };
            let weight = weight_attr
                .and_then(|attr| graph.edge_weight(&u, &v, attr))
                .unwrap_or(1.0);
            merged
                .entry((a.min(b), a.max(b)))
                .and_modify(|e| e.weight = weight)
                .or_insert(ResolvedEdge { a, b, weight });
        }

        let mut degree = vec![0usize; nodes.len()];
        let mut edges = Vec::with_capacity(merged.len());
        for e in merged.into_values() {
            degree[e.a] += 1;
            degree[e.b] += 1;
            if e.a != e.b {
                edges.push(e);
            }
        }

        Ok(Self {
            nodes: nodes.into_iter().collect(),
            edges,
            degree,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Dense symmetric adjacency matrix holding edge weights.
    pub fn adjacency(&self) -> nalgebra::DMatrix<f64> {
        let n = self.len();
        let mut adj = nalgebra::DMatrix::<f64>::zeros(n, n);
        for e in &self.edges {
            adj[(e.a, e.b)] = e.weight;
            adj[(e.b, e.a)] = e.weight;
        }
        adj
    }
}
