//! Reference walks from the positional metadata of the reads.
//!
//! Two policies are available. [Policy::Components] partitions the graph into components and
//! runs one DFS per component. [Policy::CoverageSweep] runs DFS from the leftmost remaining
//! read until the reference is covered. In both cases, only the positive strand is walked, and
//! the negative strand is labeled through the mirrored edges.
use crate::find_union::FindUnion;
use definitions::{partner, GraphError, OverlapGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Walks from components shorter than this are dropped, except the longest one.
pub const MIN_COMPONENT_WALK: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    Components,
    CoverageSweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthConfig {
    pub policy: Policy,
    /// Maximum number of node expansions per DFS. Unlimited if `None`.
    pub max_dfs_steps: Option<usize>,
    pub min_component_walk: usize,
}

impl GroundTruthConfig {
    pub fn new(policy: Policy, max_dfs_steps: Option<usize>, min_component_walk: usize) -> Self {
        Self {
            policy,
            max_dfs_steps,
            min_component_walk,
        }
    }
}

impl std::default::Default for GroundTruthConfig {
    fn default() -> Self {
        Self::new(Policy::Components, None, MIN_COMPONENT_WALK)
    }
}

/// Supervision labels. Nodes and edges on the positive strand, and their mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub walks: Vec<Vec<usize>>,
    pub correct_nodes: BTreeSet<usize>,
    pub mirrored_nodes: BTreeSet<usize>,
    pub correct_edges: BTreeSet<usize>,
    pub mirrored_edges: BTreeSet<usize>,
}

pub trait GroundTruthBuilder {
    fn ground_truth(&self, c: &GroundTruthConfig) -> Result<GroundTruth, GraphError>;
}

impl GroundTruthBuilder for OverlapGraph {
    fn ground_truth(&self, c: &GroundTruthConfig) -> Result<GroundTruth, GraphError> {
        let walks = match c.policy {
            Policy::Components => component_walks(self, c),
            Policy::CoverageSweep => coverage_walks(self, c),
        };
        let mut truth = GroundTruth::default();
        for walk in walks.iter() {
            truth.correct_nodes.extend(walk.iter().copied());
            truth.mirrored_nodes.extend(walk.iter().map(|&n| partner(n)));
            let (correct, mirrored) = correct_edges(self, walk)?;
            truth.correct_edges.extend(correct);
            truth.mirrored_edges.extend(mirrored);
        }
        truth.walks = walks;
        info!(
            "TRUTH\t{:?}\t{}\t{}\t{}",
            c.policy,
            truth.walks.len(),
            truth.correct_nodes.len(),
            truth.correct_edges.len()
        );
        Ok(truth)
    }
}

/// Components, largest first.
/// Each component is first grown by BFS from a node without predecessors. Then two components are
/// merged if an edge goes from one into a node of the other that has successors.
pub fn components(graph: &OverlapGraph) -> Vec<Vec<usize>> {
    let mut assignment: Vec<Option<usize>> = vec![None; graph.num_nodes()];
    let mut num_components = 0;
    for start in (0..graph.num_nodes()).filter(|&n| graph.in_degree(n) == 0) {
        if assignment[start].is_some() {
            continue;
        }
        let mut queue = VecDeque::from(vec![start]);
        assignment[start] = Some(num_components);
        while let Some(node) = queue.pop_front() {
            for next in graph.successors(node) {
                if assignment[next].is_none() {
                    assignment[next] = Some(num_components);
                    queue.push_back(next);
                }
            }
        }
        num_components += 1;
    }
    let mut fu = FindUnion::new(num_components);
    for edge in graph.edges() {
        if let (Some(from), Some(to)) = (assignment[edge.from], assignment[edge.to]) {
            // A joint without successors is a dead end, not a bridge.
            if from != to && graph.out_degree(edge.to) > 0 {
                fu.unite(from, to);
            }
        }
    }
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut order = vec![];
    for (node, comp) in assignment.iter().enumerate() {
        if let Some(root) = comp.and_then(|c| fu.find(c)) {
            let group = groups.entry(root).or_insert_with(|| {
                order.push(root);
                vec![]
            });
            group.push(node);
        }
    }
    let mut components: Vec<_> = order
        .into_iter()
        .filter_map(|root| groups.remove(&root))
        .collect();
    components.sort_by_key(|c| std::cmp::Reverse(c.len()));
    debug!("TRUTH\tComponents\t{}\t{}", num_components, components.len());
    components
}

/// The result of a DFS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfsWalk {
    /// From the start to the node reaching furthest on the reference.
    pub walk: Vec<usize>,
    pub visited: BTreeSet<usize>,
    /// True if the expansion budget ran out.
    pub exhausted: bool,
}

/// DFS on the positive strand from `start`, never entering `avoid`.
/// See [dfs_walk_by] for the branching rule.
pub fn dfs_walk(
    graph: &OverlapGraph,
    start: usize,
    avoid: &HashSet<usize>,
    budget: Option<usize>,
) -> DfsWalk {
    dfs_walk_by(graph, start, |n| avoid.contains(&n), budget)
}

/// DFS on the positive strand from `start`, never entering a blocked node.
/// Successors starting inside the current read are preferred, leftmost first. If there is none,
/// successors starting after the end of the current read are taken.
/// At most `budget` nodes are expanded. The walk ends at the node with the largest `read_end`.
pub fn dfs_walk_by<F: Fn(usize) -> bool>(
    graph: &OverlapGraph,
    start: usize,
    blocked: F,
    budget: Option<usize>,
) -> DfsWalk {
    let mut stack = vec![start];
    let mut visited = BTreeSet::new();
    let mut parent: HashMap<usize, usize> = HashMap::new();
    let mut best = start;
    let mut exhausted = false;
    while let Some(current) = stack.pop() {
        if visited.contains(&current) {
            continue;
        }
        if budget.map_or(false, |b| b <= visited.len()) {
            exhausted = true;
            break;
        }
        visited.insert(current);
        let node = graph.node(current);
        if graph.node(best).read_end < node.read_end {
            best = current;
        }
        let candidates: Vec<usize> = graph
            .successors(current)
            .filter(|&n| !visited.contains(&n) && !blocked(n))
            .filter(|&n| graph.node(n).read_strand.is_forward())
            .collect();
        let inside: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&n| (node.read_start..=node.read_end).contains(&graph.node(n).read_start))
            .collect();
        let mut next = if inside.is_empty() {
            candidates
                .into_iter()
                .filter(|&n| node.read_end < graph.node(n).read_start)
                .collect()
        } else {
            inside
        };
        // Pushed in reverse so that the leftmost one is popped first.
        next.sort_by_key(|&n| std::cmp::Reverse((graph.node(n).read_start, n)));
        next.dedup();
        for n in next {
            parent.insert(n, current);
            stack.push(n);
        }
    }
    let mut walk = vec![best];
    while let Some(&prev) = parent.get(walk.last().unwrap_or(&start)) {
        walk.push(prev);
    }
    walk.reverse();
    trace!("TRUTH\tDFS\t{}\t{}\t{}", start, walk.len(), visited.len());
    DfsWalk {
        walk,
        visited,
        exhausted,
    }
}

/// The leftmost positive-strand node of `component` without predecessors.
pub fn component_start(graph: &OverlapGraph, component: &[usize]) -> Option<usize> {
    component
        .iter()
        .copied()
        .filter(|&n| graph.in_degree(n) == 0 && graph.node(n).read_strand.is_forward())
        .min_by_key(|&n| (graph.node(n).read_start, n))
}

pub fn has_valid_start(graph: &OverlapGraph, component: &[usize]) -> bool {
    component_start(graph, component).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No positive-strand node without predecessors.
    NoPositiveStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentWalk {
    Found(Vec<usize>),
    Skipped(SkipReason),
}

/// DFS inside `component` from its start.
pub fn walk_component(
    graph: &OverlapGraph,
    component: &[usize],
    budget: Option<usize>,
) -> ComponentWalk {
    let start = match component_start(graph, component) {
        Some(start) => start,
        None => return ComponentWalk::Skipped(SkipReason::NoPositiveStart),
    };
    let mut inside = vec![false; graph.num_nodes()];
    for &n in component {
        inside[n] = true;
    }
    let dfs = dfs_walk_by(graph, start, |n| !inside[n], budget);
    if dfs.exhausted {
        debug!("TRUTH\tBudget\t{}\t{}", start, dfs.walk.len());
    }
    ComponentWalk::Found(dfs.walk)
}

/// One walk per component. The longest walk is always kept. The others are kept if they are
/// long enough and disjoint from the walks kept so far.
pub fn component_walks(graph: &OverlapGraph, c: &GroundTruthConfig) -> Vec<Vec<usize>> {
    let mut walks: Vec<Vec<usize>> = components(graph)
        .iter()
        .filter_map(
            |component| match walk_component(graph, component, c.max_dfs_steps) {
                ComponentWalk::Found(walk) => Some(walk),
                ComponentWalk::Skipped(reason) => {
                    trace!("TRUTH\tSkip\t{}\t{:?}", component.len(), reason);
                    None
                }
            },
        )
        .collect();
    walks.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let mut used: HashSet<usize> = HashSet::new();
    let mut selected = vec![];
    for (idx, walk) in walks.into_iter().enumerate() {
        let is_long = c.min_component_walk <= walk.len();
        if idx == 0 || (is_long && walk.iter().all(|n| !used.contains(n))) {
            used.extend(walk.iter().copied());
            selected.push(walk);
        }
    }
    selected
}

/// Sweep the positive strand from left to right. Each walk should extend the covered region.
pub fn coverage_walks(graph: &OverlapGraph, c: &GroundTruthConfig) -> Vec<Vec<usize>> {
    let mut seeds: Vec<usize> = (0..graph.num_nodes())
        .filter(|&n| graph.node(n).read_strand.is_forward())
        .collect();
    seeds.sort_by_key(|&n| (graph.node(n).read_start, n));
    let terminal_end = match seeds.iter().map(|&n| graph.node(n).read_end).max() {
        Some(end) => end,
        None => return vec![],
    };
    let mut visited: HashSet<usize> = HashSet::new();
    let mut covered = i64::MIN;
    let mut walks = vec![];
    for seed in seeds {
        if terminal_end <= covered {
            break;
        }
        if visited.contains(&seed) {
            continue;
        }
        let dfs = dfs_walk(graph, seed, &visited, c.max_dfs_steps);
        visited.extend(dfs.visited);
        let end = dfs.walk.last().map_or(i64::MIN, |&n| graph.node(n).read_end);
        if 1 < dfs.walk.len() && covered < end {
            covered = end;
            walks.push(dfs.walk);
        }
    }
    debug!("TRUTH\tSweep\t{}\t{}\t{}", walks.len(), covered, terminal_end);
    walks
}

/// Edges between overlapping nodes of `walk`, and their mirrors.
/// From each node, the following nodes are scanned while they are successors overlapping it.
pub fn correct_edges(
    graph: &OverlapGraph,
    walk: &[usize],
) -> Result<(Vec<usize>, Vec<usize>), GraphError> {
    let mut correct = vec![];
    let mut mirrored = vec![];
    for (idx, &src) in walk.iter().enumerate() {
        for &dst in walk.iter().skip(idx + 1) {
            let edge = match graph.edge_between(src, dst) {
                Some(edge) if graph.node(dst).read_start < graph.node(src).read_end => edge,
                _ => break,
            };
            let (from, to) = (partner(dst), partner(src));
            let mirror = graph
                .edge_between(from, to)
                .ok_or(GraphError::MissingMirrorEdge { edge, from, to })?;
            correct.push(edge);
            mirrored.push(mirror);
        }
    }
    Ok((correct, mirrored))
}

/// The union of the positive-strand read intervals, sorted.
pub fn interval_union(graph: &OverlapGraph) -> Vec<(i64, i64)> {
    let mut intervals: Vec<(i64, i64)> = graph
        .nodes()
        .iter()
        .filter(|n| n.read_strand.is_forward())
        .map(|n| (n.read_start, n.read_end))
        .collect();
    intervals.sort_unstable();
    let mut union: Vec<(i64, i64)> = vec![];
    for (start, end) in intervals {
        match union.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => union.push((start, end)),
        }
    }
    union
}

#[cfg(test)]
mod tests {
    use super::*;
    use definitions::{OverlapEdge, ReadNode, Strand};
    // Read k is node 2k on the positive strand and 2k+1 on the negative one.
    // An overlap a->b gives 2a->2b and 2b+1->2a+1.
    fn doubled(reads: &[(i64, i64)], overlaps: &[(usize, usize)]) -> OverlapGraph {
        let nodes = reads
            .iter()
            .flat_map(|&(s, e)| {
                vec![
                    ReadNode::new(s, e, Strand::Forward),
                    ReadNode::new(s, e, Strand::Reverse),
                ]
            })
            .collect();
        let edges = overlaps
            .iter()
            .flat_map(|&(a, b)| {
                vec![
                    OverlapEdge::new(2 * a, 2 * b, 10, 1.0),
                    OverlapEdge::new(2 * b + 1, 2 * a + 1, 10, 1.0),
                ]
            })
            .collect();
        OverlapGraph::new(nodes, edges).unwrap()
    }
    fn chain(offset: usize, len: usize) -> Vec<(usize, usize)> {
        (offset..offset + len - 1).map(|k| (k, k + 1)).collect()
    }
    fn positions(num: usize) -> Vec<(i64, i64)> {
        (0..num as i64).map(|k| (10 * k, 10 * k + 15)).collect()
    }
    fn single_strand(edges: &[(usize, usize)]) -> OverlapGraph {
        let nodes = (0..6)
            .map(|k| ReadNode::new(10 * k, 10 * k + 15, Strand::Forward))
            .collect();
        let edges = edges
            .iter()
            .map(|&(f, t)| OverlapEdge::new(f, t, 5, 1.0))
            .collect();
        OverlapGraph::new(nodes, edges).unwrap()
    }
    #[test]
    fn dead_joint_does_not_merge() {
        let graph = single_strand(&[(0, 1), (1, 2), (3, 4), (4, 5), (4, 2)]);
        let components = components(&graph);
        assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }
    #[test]
    fn live_joint_merges() {
        let graph = single_strand(&[(0, 1), (1, 2), (3, 4), (4, 5), (4, 1)]);
        let components = components(&graph);
        assert_eq!(components, vec![vec![0, 1, 2, 3, 4, 5]]);
    }
    #[test]
    fn merge_is_transitive() {
        let nodes = (0..7)
            .map(|k| ReadNode::new(k, k + 1, Strand::Forward))
            .collect();
        // BFS gives {0,1,5,6}, {2,3} and {4}. The last two join the first through 1 and 5.
        let edges = [(0, 1), (2, 3), (4, 5), (5, 6), (3, 1), (1, 5), (3, 5)]
            .iter()
            .map(|&(f, t)| OverlapEdge::new(f, t, 1, 1.0))
            .collect();
        let graph = OverlapGraph::new(nodes, edges).unwrap();
        let components = components(&graph);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 7);
    }
    fn dfs_graph() -> OverlapGraph {
        let reads = [(0, 100), (60, 160), (30, 130), (140, 240), (300, 400)];
        doubled(&reads, &[(0, 1), (0, 2), (2, 1), (1, 3), (3, 4)])
    }
    #[test]
    fn dfs_prefers_leftmost_overlap() {
        let graph = dfs_graph();
        let dfs = dfs_walk(&graph, 0, &HashSet::new(), None);
        // Read 2 starts before read 1, and read 4 is reached over a gap.
        assert_eq!(dfs.walk, vec![0, 4, 2, 6, 8]);
        assert!(!dfs.exhausted);
        assert_eq!(dfs.visited.len(), 5);
        assert!(dfs.visited.iter().all(|n| n % 2 == 0));
    }
    #[test]
    fn dfs_budget_and_avoid() {
        let graph = dfs_graph();
        let dfs = dfs_walk(&graph, 0, &HashSet::new(), Some(2));
        assert!(dfs.exhausted);
        assert_eq!(dfs.walk, vec![0, 4]);
        let avoid: HashSet<_> = vec![4].into_iter().collect();
        let dfs = dfs_walk(&graph, 0, &avoid, None);
        assert_eq!(dfs.walk, vec![0, 2, 6, 8]);
    }
    #[test]
    fn component_policy() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut overlaps = chain(0, 12);
        overlaps.extend(chain(12, 3));
        let graph = doubled(&positions(15), &overlaps);
        let c = GroundTruthConfig::default();
        let truth = graph.ground_truth(&c).unwrap();
        let expected: Vec<_> = (0..12).map(|k| 2 * k).collect();
        assert_eq!(truth.walks, vec![expected.clone()]);
        assert_eq!(truth.correct_nodes, expected.iter().copied().collect());
        assert!(truth.mirrored_nodes.iter().all(|n| n % 2 == 1));
        assert_eq!(truth.correct_edges.len(), 11);
        assert_eq!(truth.mirrored_edges.len(), 11);
        assert!(truth.correct_edges.iter().all(|e| e % 2 == 0));
        assert!(truth.mirrored_edges.iter().all(|e| e % 2 == 1));
        let c = GroundTruthConfig::new(Policy::Components, None, 3);
        let truth = graph.ground_truth(&c).unwrap();
        assert_eq!(truth.walks.len(), 2);
        assert_eq!(truth.walks[1], vec![24, 26, 28]);
    }
    #[test]
    fn negative_component_is_skipped() {
        let graph = doubled(&positions(3), &chain(0, 3));
        let components = components(&graph);
        assert_eq!(components.len(), 2);
        let negative = components.iter().find(|c| c.contains(&1)).unwrap();
        assert!(!has_valid_start(&graph, negative));
        assert_eq!(
            walk_component(&graph, negative, None),
            ComponentWalk::Skipped(SkipReason::NoPositiveStart)
        );
        let positive = components.iter().find(|c| c.contains(&0)).unwrap();
        assert_eq!(component_start(&graph, positive), Some(0));
        assert_eq!(
            walk_component(&graph, positive, None),
            ComponentWalk::Found(vec![0, 2, 4])
        );
    }
    #[test]
    fn coverage_policy() {
        let reads = [
            (0, 100),
            (50, 150),
            (100, 200),
            (120, 180),
            (190, 300),
            (250, 350),
            (10, 60),
            (40, 90),
        ];
        let graph = doubled(&reads, &[(0, 1), (1, 2), (4, 5), (6, 7)]);
        let c = GroundTruthConfig::new(Policy::CoverageSweep, None, MIN_COMPONENT_WALK);
        let walks = coverage_walks(&graph, &c);
        // 6->7 ends before 2 does, and 3 alone is a single node.
        assert_eq!(walks, vec![vec![0, 2, 4], vec![8, 10]]);
        let truth = graph.ground_truth(&c).unwrap();
        assert_eq!(truth.correct_edges.len(), 3);
    }
    #[test]
    fn transitive_edges_are_correct() {
        let graph = doubled(&[(0, 100), (30, 130), (60, 160)], &[(0, 1), (1, 2), (0, 2)]);
        let (correct, mirrored) = correct_edges(&graph, &[0, 2, 4]).unwrap();
        assert_eq!(correct, vec![0, 4, 2]);
        assert_eq!(mirrored, vec![1, 5, 3]);
    }
    #[test]
    fn missing_mirror() {
        let nodes = vec![
            ReadNode::new(0, 100, Strand::Forward),
            ReadNode::new(0, 100, Strand::Reverse),
            ReadNode::new(50, 150, Strand::Forward),
            ReadNode::new(50, 150, Strand::Reverse),
        ];
        let graph = OverlapGraph::new(nodes, vec![OverlapEdge::new(0, 2, 50, 1.0)]).unwrap();
        assert!(matches!(
            correct_edges(&graph, &[0, 2]),
            Err(GraphError::MissingMirrorEdge {
                edge: 0,
                from: 3,
                to: 1
            })
        ));
    }
    #[test]
    fn union_of_intervals() {
        let graph = dfs_graph();
        assert_eq!(interval_union(&graph), vec![(0, 240), (300, 400)]);
    }
}
