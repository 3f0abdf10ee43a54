//! The outer loop of the decoding.
//! Each iteration routes a batch of candidates on the graph of remaining nodes,
//! accepts the longest sanitized candidate, and removes it together with its reverse strand.
use crate::error::DecodeError;
use crate::extract::{extract_remaining, ConsumedNodes};
use crate::greedy_router::{route, RouterConfig};
use crate::walk_check::WalkReport;
use definitions::{DecodedWalks, OverlapGraph};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub router: RouterConfig,
    /// Stop when the best candidate is shorter than this.
    pub len_threshold: usize,
    /// Stop when no more than this many nodes remain.
    pub min_remaining_nodes: usize,
    pub seed: u64,
    /// Check the strand pairing of the graph before decoding.
    pub check_strands: bool,
}

impl ExtractionConfig {
    pub fn new(
        router: RouterConfig,
        len_threshold: usize,
        min_remaining_nodes: usize,
        seed: u64,
        check_strands: bool,
    ) -> Self {
        Self {
            router,
            len_threshold,
            min_remaining_nodes,
            seed,
            check_strands,
        }
    }
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.len_threshold == 0 {
            Err(DecodeError::InvalidConfig("len_threshold should be positive".to_string()))
        } else if self.router.batch_size == 0 {
            Err(DecodeError::InvalidConfig("batch_size should be positive".to_string()))
        } else if self.router.cycle_check_interval == 0 {
            Err(DecodeError::InvalidConfig(
                "cycle_check_interval should be positive".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl std::default::Default for ExtractionConfig {
    fn default() -> Self {
        Self::new(RouterConfig::default(), 10, 10, 42, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub remaining_nodes: usize,
    /// Consumed nodes at the end of this iteration.
    pub consumed_nodes: usize,
    pub best_length: usize,
    pub forward_steps: usize,
    pub backward_steps: usize,
    pub accepted: bool,
    /// False if the accepted walk switches strands.
    pub strand_consistent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub contigs: DecodedWalks,
    pub iterations: Vec<IterationSummary>,
}

pub trait ContigExtraction {
    fn extract_contigs(&self, c: &ExtractionConfig) -> Result<ExtractionResult, DecodeError>;
}

impl ContigExtraction for OverlapGraph {
    fn extract_contigs(&self, c: &ExtractionConfig) -> Result<ExtractionResult, DecodeError> {
        c.validate()?;
        // Every edge should be scored before routing.
        self.scores()?;
        let graph = self.without_self_loops();
        if c.check_strands {
            graph.check_strand_pairing()?;
        }
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(c.seed);
        let mut consumed = ConsumedNodes::new(graph.num_nodes());
        let mut result = ExtractionResult::default();
        loop {
            let sub = extract_remaining(&graph, &consumed);
            if sub.num_nodes() <= c.min_remaining_nodes {
                debug!("CONTIG\tRemaining\t{}\tStop", sub.num_nodes());
                break;
            }
            let batch = route(&sub, &c.router, &mut rng)?;
            let best = batch.best().unwrap_or(&[]);
            let accepted = c.len_threshold <= best.len();
            let mut summary = IterationSummary {
                remaining_nodes: sub.num_nodes(),
                consumed_nodes: consumed.len(),
                best_length: best.len(),
                forward_steps: batch.forward.steps,
                backward_steps: batch.backward.steps,
                accepted,
                strand_consistent: true,
            };
            if !accepted {
                debug!("CONTIG\tBest\t{}\tBelowThreshold", best.len());
                result.iterations.push(summary);
                break;
            }
            consumed.consume_walk(best);
            summary.consumed_nodes = consumed.len();
            let report = WalkReport::new(&graph, best);
            debug!("CONTIG\tCheck\t{}", report);
            if !report.strand_switches.is_empty() {
                warn!(
                    "CONTIG\tStrandSwitch\t{}\t{:?}",
                    result.contigs.walks.len(),
                    report.strand_switches
                );
                summary.strand_consistent = false;
            }
            info!(
                "CONTIG\t{}\t{}\t{}",
                result.contigs.walks.len(),
                best.len(),
                sub.num_nodes()
            );
            result.contigs.lengths.push(best.len());
            result.contigs.walks.push(best.to_vec());
            result.iterations.push(summary);
        }
        info!(
            "CONTIG\tTotal\t{}\t{}",
            result.contigs.walks.len(),
            consumed.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy_router::ScoreKind;
    use definitions::{partner, GraphError, OverlapEdge, ReadNode, Strand};
    use std::collections::HashSet;
    // Reads `offset..offset+len` form a chain on the forward strand.
    // Read k is node 2k on the forward strand and 2k+1 on the reverse strand.
    fn chains(lens: &[usize]) -> OverlapGraph {
        let total: usize = lens.iter().sum();
        let nodes: Vec<_> = (0..total)
            .flat_map(|k| {
                let start = 10 * k as i64;
                vec![
                    ReadNode::new(start, start + 15, Strand::Forward),
                    ReadNode::new(start, start + 15, Strand::Reverse),
                ]
            })
            .collect();
        let mut edges = vec![];
        let mut offset = 0;
        for &len in lens {
            for k in offset..offset + len - 1 {
                let (from, to) = (2 * k, 2 * k + 2);
                edges.push(OverlapEdge::new(from, to, 5, 1.0).with_score(1.0));
                edges.push(OverlapEdge::new(partner(to), partner(from), 5, 1.0).with_score(1.0));
            }
            offset += len;
        }
        OverlapGraph::new(nodes, edges).unwrap()
    }
    fn config(len_threshold: usize) -> ExtractionConfig {
        let router = RouterConfig::new(20, 100, ScoreKind::Logit);
        ExtractionConfig::new(router, len_threshold, 2, 7, true)
    }
    #[test]
    fn strand_closure() {
        let _ = env_logger::builder().is_test(true).try_init();
        let graph = chains(&[6]);
        let result = graph.extract_contigs(&config(3)).unwrap();
        // The forward walk and its mirror can not be both accepted.
        assert_eq!(result.contigs.walks.len(), 1);
        let walk = &result.contigs.walks[0];
        assert_eq!(walk.len(), 6);
        let expected: Vec<Vec<usize>> = vec![vec![0, 2, 4, 6, 8, 10], vec![11, 9, 7, 5, 3, 1]];
        assert!(expected.contains(walk), "{:?}", walk);
        assert!(result.iterations[0].strand_consistent);
    }
    #[test]
    fn strand_switch_is_flagged() {
        let _ = env_logger::builder().is_test(true).try_init();
        // 0->2->4 jumps to the reverse strand at 4->7, and so does its mirror 10->8->6->5.
        let nodes = chains(&[6]).nodes().to_vec();
        let forward = [(0, 2), (2, 4), (4, 7), (7, 9), (9, 11)];
        let edges: Vec<_> = forward
            .iter()
            .flat_map(|&(from, to)| {
                vec![
                    OverlapEdge::new(from, to, 5, 1.0).with_score(1.0),
                    OverlapEdge::new(partner(to), partner(from), 5, 1.0).with_score(1.0),
                ]
            })
            .collect();
        let graph = OverlapGraph::new(nodes, edges).unwrap();
        let result = graph.extract_contigs(&config(3)).unwrap();
        assert_eq!(result.contigs.walks.len(), 1);
        let walk = &result.contigs.walks[0];
        let expected: Vec<Vec<usize>> = vec![vec![0, 2, 4, 7, 9, 11], vec![10, 8, 6, 5, 3, 1]];
        assert!(expected.contains(walk), "{:?}", walk);
        let summary = &result.iterations[0];
        assert!(summary.accepted);
        assert!(!summary.strand_consistent);
    }
    #[test]
    fn disjoint_contigs() {
        let _ = env_logger::builder().is_test(true).try_init();
        let graph = chains(&[6, 6]);
        let result = graph.extract_contigs(&config(3)).unwrap();
        let walks = &result.contigs.walks;
        assert_eq!(walks.len(), 2);
        assert_eq!(result.contigs.lengths, vec![6, 6]);
        let mut reads = HashSet::new();
        for walk in walks.iter() {
            for &n in walk.iter() {
                assert!(reads.insert(n / 2), "{} used twice", n);
            }
        }
        let first: HashSet<_> = walks[0].iter().collect();
        assert!(walks[1].iter().all(|n| !first.contains(&partner(*n))));
    }
    #[test]
    fn monotonic_coverage() {
        let graph = chains(&[8, 5, 6, 3]);
        let result = graph.extract_contigs(&config(3)).unwrap();
        let consumed: Vec<_> = result.iterations.iter().map(|s| s.consumed_nodes).collect();
        assert!(consumed.windows(2).all(|w| w[0] <= w[1]), "{:?}", consumed);
        assert!(consumed.iter().all(|&c| c <= graph.num_nodes()));
        let lengths = &result.contigs.lengths;
        assert_eq!(lengths.iter().sum::<usize>(), 22);
        for walk in result.contigs.walks.iter() {
            let set: HashSet<_> = walk.iter().collect();
            assert_eq!(set.len(), walk.len());
        }
    }
    #[test]
    fn below_threshold() {
        let graph = chains(&[6]);
        let result = graph.extract_contigs(&config(7)).unwrap();
        assert!(result.contigs.walks.is_empty());
        assert_eq!(result.iterations.len(), 1);
        assert!(!result.iterations[0].accepted);
        assert_eq!(result.iterations[0].best_length, 6);
        assert_eq!(result.iterations[0].consumed_nodes, 0);
    }
    #[test]
    fn missing_score_fails_fast() {
        let graph = chains(&[6]);
        let mut edges = graph.edges().to_vec();
        edges[3].score = None;
        let graph = OverlapGraph::new(graph.nodes().to_vec(), edges).unwrap();
        let result = graph.extract_contigs(&config(3));
        assert!(matches!(
            result,
            Err(DecodeError::Graph(GraphError::MissingScore { edge: 3 }))
        ));
    }
    #[test]
    fn broken_strands() {
        let graph = chains(&[6]);
        let mut edges = graph.edges().to_vec();
        edges.pop();
        let graph = OverlapGraph::new(graph.nodes().to_vec(), edges).unwrap();
        let result = graph.extract_contigs(&config(3));
        assert!(matches!(
            result,
            Err(DecodeError::Graph(GraphError::MissingMirrorEdge { .. }))
        ));
        let mut c = config(3);
        c.check_strands = false;
        assert!(graph.extract_contigs(&c).is_ok());
    }
    #[test]
    fn invalid_config() {
        let graph = chains(&[6]);
        let result = graph.extract_contigs(&config(0));
        assert!(matches!(result, Err(DecodeError::InvalidConfig(_))));
        let mut c = config(3);
        c.router.cycle_check_interval = 0;
        assert!(matches!(
            graph.extract_contigs(&c),
            Err(DecodeError::InvalidConfig(_))
        ));
        assert!(ExtractionConfig::default().validate().is_ok());
    }
}
