//! Definitions -- A tiny interface for the contig decoding problem.
//! We interact with the graph builder and the scoring model via JSON object format. The message is
//! one, possibly large, structure named [OverlapGraph](OverlapGraph), whose edges may carry
//! the confidence score produced by an external model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod error;
pub use error::GraphError;

/// Node id of the reverse complement of `node`.
/// Nodes are allocated in adjacent pairs, so the partner of `2k` is `2k+1` and vice versa.
pub fn partner(node: usize) -> usize {
    node ^ 1
}

/// Orientation of a read with respect to the reference.
/// In JSON, it is encoded as `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_forward(&self) -> bool {
        matches!(self, Strand::Forward)
    }
}

impl std::ops::Not for Strand {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

impl TryFrom<i8> for Strand {
    type Error = String;
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Strand::Forward),
            -1 => Ok(Strand::Reverse),
            _ => Err(format!("read_strand should be 1 or -1, found {}", value)),
        }
    }
}

impl From<Strand> for i8 {
    fn from(strand: Strand) -> i8 {
        match strand {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x = match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        };
        write!(f, "{}", x)
    }
}

/// An oriented read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReadNode {
    /// Start position of the read on the reference (0-index).
    pub read_start: i64,
    /// End position of the read on the reference.
    pub read_end: i64,
    pub read_strand: Strand,
}

impl ReadNode {
    pub fn new(read_start: i64, read_end: i64, read_strand: Strand) -> Self {
        Self {
            read_start,
            read_end,
            read_strand,
        }
    }
}

/// An overlap between two oriented reads, `from` -> `to`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OverlapEdge {
    pub from: usize,
    pub to: usize,
    pub overlap_length: u64,
    pub overlap_similarity: f64,
    /// Confidence of this edge. Higher is better. `None` until annotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl OverlapEdge {
    pub fn new(from: usize, to: usize, overlap_length: u64, overlap_similarity: f64) -> Self {
        Self {
            from,
            to,
            overlap_length,
            overlap_similarity,
            score: None,
        }
    }
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Deserialize)]
struct GraphRecord {
    nodes: Vec<ReadNode>,
    edges: Vec<OverlapEdge>,
}

impl TryFrom<GraphRecord> for OverlapGraph {
    type Error = GraphError;
    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        Self::new(record.nodes, record.edges)
    }
}

/// Directed, strand-doubled overlap graph.
/// Each read appears twice, once per strand, as the nodes `n` and `n^1`.
/// If there is an edge i->j, there should be j^1->i^1, the same overlap seen from the other strand.
/// Adjacency is derived from `edges` and never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord")]
pub struct OverlapGraph {
    nodes: Vec<ReadNode>,
    edges: Vec<OverlapEdge>,
    #[serde(skip)]
    succ: Vec<Vec<usize>>,
    #[serde(skip)]
    pred: Vec<Vec<usize>>,
    #[serde(skip)]
    edge_index: HashMap<(usize, usize), usize>,
}

impl std::fmt::Debug for OverlapGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let scored = self.edges.iter().filter(|e| e.score.is_some()).count();
        write!(
            f,
            "N:{}\tE:{}\tScored:{}",
            self.nodes.len(),
            self.edges.len(),
            scored
        )
    }
}

impl OverlapGraph {
    pub fn new(nodes: Vec<ReadNode>, edges: Vec<OverlapEdge>) -> Result<Self, GraphError> {
        let num_nodes = nodes.len();
        let mut succ = vec![vec![]; num_nodes];
        let mut pred = vec![vec![]; num_nodes];
        let mut edge_index = HashMap::with_capacity(edges.len());
        for (idx, edge) in edges.iter().enumerate() {
            if num_nodes <= edge.from || num_nodes <= edge.to {
                return Err(GraphError::EdgeOutOfRange {
                    edge: idx,
                    from: edge.from,
                    to: edge.to,
                    num_nodes,
                });
            }
            succ[edge.from].push(idx);
            pred[edge.to].push(idx);
            // Parallel edges are allowed, but the lookup answers the first one.
            edge_index.entry((edge.from, edge.to)).or_insert(idx);
        }
        Ok(Self {
            nodes,
            edges,
            succ,
            pred,
            edge_index,
        })
    }
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn nodes(&self) -> &[ReadNode] {
        &self.nodes
    }
    pub fn edges(&self) -> &[OverlapEdge] {
        &self.edges
    }
    pub fn node(&self, node: usize) -> &ReadNode {
        &self.nodes[node]
    }
    pub fn edge(&self, edge: usize) -> &OverlapEdge {
        &self.edges[edge]
    }
    /// Ids of the edges going out from `node`.
    pub fn out_edges(&self, node: usize) -> &[usize] {
        &self.succ[node]
    }
    /// Ids of the edges coming into `node`.
    pub fn in_edges(&self, node: usize) -> &[usize] {
        &self.pred[node]
    }
    pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.succ[node].iter().map(move |&e| self.edges[e].to)
    }
    pub fn predecessors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.pred[node].iter().map(move |&e| self.edges[e].from)
    }
    pub fn out_degree(&self, node: usize) -> usize {
        self.succ[node].len()
    }
    pub fn in_degree(&self, node: usize) -> usize {
        self.pred[node].len()
    }
    pub fn edge_between(&self, from: usize, to: usize) -> Option<usize> {
        self.edge_index.get(&(from, to)).copied()
    }
    /// The same graph with every edge flipped. Attributes are copied as-is.
    pub fn reverse(&self) -> Self {
        let edges = self
            .edges
            .iter()
            .map(|e| OverlapEdge {
                from: e.to,
                to: e.from,
                ..*e
            })
            .collect();
        // Never fails: the endpoints were already checked.
        Self::from_parts(self.nodes.clone(), edges)
    }
    /// Copy of this graph without self-loops.
    pub fn without_self_loops(&self) -> Self {
        let edges = self
            .edges
            .iter()
            .filter(|e| !e.is_self_loop())
            .copied()
            .collect();
        Self::from_parts(self.nodes.clone(), edges)
    }
    /// Induced sub-graph on `keep`. The `i`-th node of the sub-graph is `keep[i]` after sorting and deduplication.
    /// Strands are not enforced here: callers decide whether to keep both `n` and `n^1`.
    pub fn induced_subgraph(&self, keep: &[usize]) -> SubGraph {
        let mut origin: Vec<usize> = keep
            .iter()
            .copied()
            .filter(|&n| n < self.nodes.len())
            .collect();
        origin.sort_unstable();
        origin.dedup();
        let mut local = vec![None; self.nodes.len()];
        for (idx, &n) in origin.iter().enumerate() {
            local[n] = Some(idx);
        }
        let nodes = origin.iter().map(|&n| self.nodes[n]).collect();
        let edges = self
            .edges
            .iter()
            .filter_map(|e| match (local[e.from], local[e.to]) {
                (Some(from), Some(to)) => Some(OverlapEdge { from, to, ..*e }),
                _ => None,
            })
            .collect();
        let graph = Self::from_parts(nodes, edges);
        SubGraph {
            graph,
            origin,
            local,
        }
    }
    /// Write the scores onto the edges. `scores[i]` is the score of the `i`-th edge.
    pub fn annotate_scores(&mut self, scores: &[f64]) -> Result<(), GraphError> {
        if scores.len() != self.edges.len() {
            return Err(GraphError::ScoreLengthMismatch {
                scores: scores.len(),
                edges: self.edges.len(),
            });
        }
        if let Some(edge) = scores.iter().position(|x| x.is_nan()) {
            return Err(GraphError::InvalidScore { edge });
        }
        for (edge, &score) in self.edges.iter_mut().zip(scores.iter()) {
            edge.score = Some(score);
        }
        Ok(())
    }
    /// The scores of all the edges. Fails on the first edge without score.
    pub fn scores(&self) -> Result<Vec<f64>, GraphError> {
        self.edges
            .iter()
            .enumerate()
            .map(|(idx, e)| e.score.ok_or(GraphError::MissingScore { edge: idx }))
            .collect()
    }
    /// Check the strand pairing: node `n` and `n^1` are the same read on the opposite strands,
    /// and each edge i->j has its mirror j^1->i^1.
    pub fn check_strand_pairing(&self) -> Result<(), GraphError> {
        if self.nodes.len() % 2 == 1 {
            return Err(GraphError::OddNodeCount(self.nodes.len()));
        }
        for (node, read) in self.nodes.iter().enumerate().step_by(2) {
            let pair = &self.nodes[partner(node)];
            if read.read_strand == pair.read_strand {
                return Err(GraphError::StrandMismatch {
                    node,
                    partner: partner(node),
                });
            }
        }
        for (idx, edge) in self.edges.iter().enumerate() {
            let (from, to) = (partner(edge.to), partner(edge.from));
            if self.edge_between(from, to).is_none() {
                return Err(GraphError::MissingMirrorEdge {
                    edge: idx,
                    from,
                    to,
                });
            }
        }
        Ok(())
    }
    /// Parse a graph from JSON. Malformed graphs are rejected through [OverlapGraph::new].
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self, GraphError> {
        Ok(serde_json::de::from_reader(rdr)?)
    }
    fn from_parts(nodes: Vec<ReadNode>, edges: Vec<OverlapEdge>) -> Self {
        let num_nodes = nodes.len();
        let mut succ = vec![vec![]; num_nodes];
        let mut pred = vec![vec![]; num_nodes];
        let mut edge_index = HashMap::with_capacity(edges.len());
        for (idx, edge) in edges.iter().enumerate() {
            succ[edge.from].push(idx);
            pred[edge.to].push(idx);
            edge_index.entry((edge.from, edge.to)).or_insert(idx);
        }
        Self {
            nodes,
            edges,
            succ,
            pred,
            edge_index,
        }
    }
}

/// An induced sub-graph and its mapping back to the original graph.
#[derive(Debug, Clone)]
pub struct SubGraph {
    pub graph: OverlapGraph,
    /// `origin[i]` is the id of the `i`-th sub-graph node in the original graph.
    pub origin: Vec<usize>,
    local: Vec<Option<usize>>,
}

impl SubGraph {
    /// Global id of the local node.
    pub fn global_of(&self, local: usize) -> usize {
        self.origin[local]
    }
    /// Local id of the global node, if it is kept.
    pub fn local_of(&self, global: usize) -> Option<usize> {
        self.local.get(global).copied().flatten()
    }
    pub fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }
    pub fn num_edges(&self) -> usize {
        self.graph.num_edges()
    }
}

/// Parse the per-edge scores, a JSON array of numbers aligned with the edge order.
pub fn scores_from_reader<R: std::io::Read>(rdr: R) -> Result<Vec<f64>, GraphError> {
    Ok(serde_json::de::from_reader(rdr)?)
}

/// The result of a decoding run: the accepted walks and their lengths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodedWalks {
    pub walks: Vec<Vec<usize>>,
    pub lengths: Vec<usize>,
}
