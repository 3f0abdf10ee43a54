//! Score-free baseline: follow the longest overlap.
use definitions::{partner, OverlapGraph};
use rayon::prelude::*;

/// Greedy walk from `start` along the out-edge with the longest overlap.
/// Stops when that edge leads to a visited node, on either strand. Ties go to the lowest edge id.
pub fn overlap_greedy(graph: &OverlapGraph, start: usize) -> Vec<usize> {
    let mut visited = vec![false; graph.num_nodes()];
    mark(start, &mut visited);
    let mut walk = vec![start];
    let mut current = start;
    loop {
        let next = graph
            .out_edges(current)
            .iter()
            .copied()
            .reduce(|best, e| {
                let (b, x) = (graph.edge(best), graph.edge(e));
                if b.overlap_length < x.overlap_length
                    || (b.overlap_length == x.overlap_length && e < best)
                {
                    e
                } else {
                    best
                }
            });
        match next.map(|e| graph.edge(e).to) {
            Some(next) if !visited[next] => {
                current = next;
                mark(current, &mut visited);
                walk.push(current);
            }
            _ => break,
        }
    }
    walk
}

fn mark(node: usize, visited: &mut [bool]) {
    for n in [node, partner(node)] {
        if let Some(flag) = visited.get_mut(n) {
            *flag = true;
        }
    }
}

/// The longest of the greedy walks started from every positive-strand node without predecessors.
/// On ties, the walk from the smallest start wins.
pub fn longest_overlap_greedy(graph: &OverlapGraph) -> Vec<usize> {
    let starts: Vec<usize> = (0..graph.num_nodes())
        .filter(|&n| graph.in_degree(n) == 0 && graph.node(n).read_strand.is_forward())
        .collect();
    let walks: Vec<Vec<usize>> = starts
        .par_iter()
        .map(|&s| overlap_greedy(graph, s))
        .collect();
    debug!("BASELINE\t{}\tStarts", starts.len());
    let mut longest: Vec<usize> = vec![];
    for walk in walks {
        if longest.len() < walk.len() {
            longest = walk;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use definitions::{OverlapEdge, ReadNode, Strand};
    fn build(edges: &[(usize, usize, u64)]) -> OverlapGraph {
        let nodes = (0..10)
            .map(|n| {
                let strand = if n % 2 == 0 {
                    Strand::Forward
                } else {
                    Strand::Reverse
                };
                ReadNode::new(10 * n as i64, 10 * n as i64 + 20, strand)
            })
            .collect();
        let edges = edges
            .iter()
            .map(|&(f, t, len)| OverlapEdge::new(f, t, len, 1.0))
            .collect();
        OverlapGraph::new(nodes, edges).unwrap()
    }
    #[test]
    fn longest_overlap_first() {
        let graph = build(&[(0, 2, 5), (0, 4, 8), (4, 6, 3), (2, 6, 9), (6, 8, 1)]);
        assert_eq!(overlap_greedy(&graph, 0), vec![0, 4, 6, 8]);
        assert_eq!(overlap_greedy(&graph, 2), vec![2, 6, 8]);
    }
    #[test]
    fn partner_is_never_entered() {
        // 2 -> 1 would come back on the other strand of 0.
        let graph = build(&[(0, 2, 5), (2, 1, 7), (2, 4, 3)]);
        assert_eq!(overlap_greedy(&graph, 0), vec![0, 2]);
        let graph = build(&[(0, 2, 5), (2, 1, 2), (2, 4, 3)]);
        assert_eq!(overlap_greedy(&graph, 0), vec![0, 2, 4]);
    }
    #[test]
    fn ties_and_longest() {
        let graph = build(&[(0, 4, 5), (0, 2, 5), (2, 6, 5), (8, 6, 5)]);
        // Edge 0 (0->4) wins the tie.
        assert_eq!(overlap_greedy(&graph, 0), vec![0, 4]);
        // Starts: 0 and 8.
        assert_eq!(longest_overlap_greedy(&graph), vec![0, 4]);
        let graph = build(&[(0, 2, 5), (8, 6, 5), (6, 4, 5)]);
        assert_eq!(longest_overlap_greedy(&graph), vec![8, 6, 4]);
    }
}
