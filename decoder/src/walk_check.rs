//! Diagnostics of a walk against the positional metadata of its reads.
use definitions::OverlapGraph;
use serde::{Deserialize, Serialize};

/// Positions whose strand differs from the strand of the first node.
pub fn strand_switches(graph: &OverlapGraph, walk: &[usize]) -> Vec<usize> {
    let first = match walk.first() {
        Some(&n) => graph.node(n).read_strand,
        None => return vec![],
    };
    walk.iter()
        .enumerate()
        .filter_map(|(idx, &n)| (graph.node(n).read_strand != first).then_some(idx))
        .collect()
}

/// Positions `i` such that `walk[i]` and `walk[i+1]` are on the same strand but do not overlap on the reference.
pub fn overlap_gaps(graph: &OverlapGraph, walk: &[usize]) -> Vec<usize> {
    walk.windows(2)
        .enumerate()
        .filter_map(|(idx, pair)| {
            let (src, dst) = (graph.node(pair[0]), graph.node(pair[1]));
            if src.read_strand != dst.read_strand {
                return None;
            }
            let gap = match src.read_strand.is_forward() {
                true => src.read_end < dst.read_start,
                false => dst.read_end < src.read_start,
            };
            gap.then_some(idx)
        })
        .collect()
}

/// Distance on the reference between the start of the first read and the end of the last one.
pub fn walk_span(graph: &OverlapGraph, walk: &[usize]) -> u64 {
    match (walk.first(), walk.last()) {
        (Some(&first), Some(&last)) => graph
            .node(last)
            .read_end
            .abs_diff(graph.node(first).read_start),
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkReport {
    pub length: usize,
    pub strand_switches: Vec<usize>,
    pub overlap_gaps: Vec<usize>,
    pub span: u64,
}

impl WalkReport {
    pub fn new(graph: &OverlapGraph, walk: &[usize]) -> Self {
        Self {
            length: walk.len(),
            strand_switches: strand_switches(graph, walk),
            overlap_gaps: overlap_gaps(graph, walk),
            span: walk_span(graph, walk),
        }
    }
    pub fn is_consistent(&self) -> bool {
        self.strand_switches.is_empty() && self.overlap_gaps.is_empty()
    }
}

impl std::fmt::Display for WalkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.length,
            self.strand_switches.len(),
            self.overlap_gaps.len(),
            self.span
        )
    }
}
