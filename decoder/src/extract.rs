//! Sub-graph extraction. Each outer iteration of the decoding works on the graph
//! induced by the nodes not yet used by any accepted contig.
use definitions::{partner, OverlapGraph, SubGraph};

/// The nodes used by accepted contigs. A node is always consumed together with its partner.
#[derive(Debug, Clone)]
pub struct ConsumedNodes {
    consumed: Vec<bool>,
    count: usize,
}

impl ConsumedNodes {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            consumed: vec![false; num_nodes],
            count: 0,
        }
    }
    /// Consume `node` and its partner. Return the number of newly consumed nodes.
    pub fn consume(&mut self, node: usize) -> usize {
        let mut added = 0;
        for n in [node, partner(node)] {
            if let Some(flag) = self.consumed.get_mut(n) {
                if !*flag {
                    *flag = true;
                    added += 1;
                }
            }
        }
        self.count += added;
        added
    }
    pub fn consume_walk(&mut self, walk: &[usize]) -> usize {
        walk.iter().map(|&n| self.consume(n)).sum()
    }
    pub fn is_consumed(&self, node: usize) -> bool {
        self.consumed.get(node).copied().unwrap_or(false)
    }
    pub fn len(&self) -> usize {
        self.count
    }
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
    pub fn remaining(&self) -> Vec<usize> {
        self.consumed
            .iter()
            .enumerate()
            .filter_map(|(n, &used)| (!used).then_some(n))
            .collect()
    }
}

/// The sub-graph induced by the nodes not consumed yet.
pub fn extract_remaining(graph: &OverlapGraph, consumed: &ConsumedNodes) -> SubGraph {
    let keep = consumed.remaining();
    let sub = graph.induced_subgraph(&keep);
    trace!(
        "SUBGRAPH\t{}\t{}\t{}",
        consumed.len(),
        sub.num_nodes(),
        sub.num_edges()
    );
    sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use definitions::{OverlapEdge, ReadNode, Strand};
    fn chain(len: usize) -> OverlapGraph {
        let nodes = (0..2 * len)
            .map(|n| {
                let strand = if n % 2 == 0 {
                    Strand::Forward
                } else {
                    Strand::Reverse
                };
                let pos = 10 * (n / 2) as i64;
                ReadNode::new(pos, pos + 15, strand)
            })
            .collect();
        let edges = (0..len - 1)
            .flat_map(|i| {
                let (f, t) = (2 * i, 2 * i + 2);
                vec![
                    OverlapEdge::new(f, t, 5, 1.0),
                    OverlapEdge::new(partner(t), partner(f), 5, 1.0),
                ]
            })
            .collect();
        OverlapGraph::new(nodes, edges).unwrap()
    }
    #[test]
    fn consume_both_strands() {
        let mut consumed = ConsumedNodes::new(6);
        assert_eq!(consumed.consume(2), 2);
        assert!(consumed.is_consumed(3));
        assert_eq!(consumed.consume(3), 0);
        assert_eq!(consumed.consume_walk(&[0, 4, 2]), 4);
        assert_eq!(consumed.len(), 6);
        assert!(consumed.remaining().is_empty());
    }
    #[test]
    fn remaining_subgraph() {
        let graph = chain(4);
        let mut consumed = ConsumedNodes::new(graph.num_nodes());
        let sub = extract_remaining(&graph, &consumed);
        assert_eq!(sub.num_nodes(), 8);
        assert_eq!(sub.num_edges(), 6);
        consumed.consume_walk(&[2]);
        let sub = extract_remaining(&graph, &consumed);
        assert_eq!(sub.num_nodes(), 6);
        // 0->2, 2->4 and their mirrors are gone.
        assert_eq!(sub.num_edges(), 2);
        assert_eq!(sub.local_of(2), None);
        assert_eq!(sub.local_of(3), None);
        for edge in sub.graph.edges() {
            let (from, to) = (sub.global_of(edge.from), sub.global_of(edge.to));
            assert!(!consumed.is_consumed(from) && !consumed.is_consumed(to));
        }
    }
}
