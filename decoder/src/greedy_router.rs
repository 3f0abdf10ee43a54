//! Batched greedy routing.
//!
//! From each sampled seed edge (u, v), a walker goes forward from v following the best-scoring
//! out-edge of each node, and another goes backward from u following the best-scoring in-edge.
//! All the walkers of a batch advance synchronously. A phase stops when all the walkers are
//! stuck, when all of them are trapped in cycles, or when the step budget runs out.
use crate::sanitize::sanitize_batch;
use crate::MIN_SEED_PROB;
use definitions::{GraphError, OverlapGraph, SubGraph};
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How to read the edge scores when sampling seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Raw logits. Passed through the logistic function.
    Logit,
    /// Already in [0,1].
    Probability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Number of candidate walks per batch.
    pub batch_size: usize,
    /// Check for cycles every this many steps.
    pub cycle_check_interval: usize,
    pub score_kind: ScoreKind,
}

impl RouterConfig {
    pub fn new(batch_size: usize, cycle_check_interval: usize, score_kind: ScoreKind) -> Self {
        Self {
            batch_size,
            cycle_check_interval,
            score_kind,
        }
    }
}

impl std::default::Default for RouterConfig {
    fn default() -> Self {
        Self::new(100, 100, ScoreKind::Logit)
    }
}

/// For each node, the next node along its best-scoring edge.
/// A node without any edge maps to itself.
#[derive(Debug, Clone)]
pub struct GreedyTable {
    next: Vec<usize>,
}

impl GreedyTable {
    /// Best out-edge of each node. Ties go to the lowest edge id.
    pub fn successors(graph: &OverlapGraph, scores: &[f64]) -> Self {
        let next = (0..graph.num_nodes())
            .into_par_iter()
            .map(|node| match best_edge(graph, graph.out_edges(node), scores) {
                Some(e) => graph.edge(e).to,
                None => node,
            })
            .collect();
        Self { next }
    }
    /// Best in-edge of each node. Ties go to the lowest edge id.
    pub fn predecessors(graph: &OverlapGraph, scores: &[f64]) -> Self {
        let next = (0..graph.num_nodes())
            .into_par_iter()
            .map(|node| match best_edge(graph, graph.in_edges(node), scores) {
                Some(e) => graph.edge(e).from,
                None => node,
            })
            .collect();
        Self { next }
    }
    pub fn next(&self, node: usize) -> usize {
        self.next[node]
    }
    pub fn is_dead_end(&self, node: usize) -> bool {
        self.next[node] == node
    }
    pub fn len(&self) -> usize {
        self.next.len()
    }
    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

fn best_edge(graph: &OverlapGraph, edges: &[usize], scores: &[f64]) -> Option<usize> {
    edges
        .iter()
        .copied()
        .filter(|&e| !graph.edge(e).is_self_loop())
        .reduce(|best, e| {
            let better = scores[best] < scores[e] || (scores[best] == scores[e] && e < best);
            if better {
                e
            } else {
                best
            }
        })
}

/// Why a phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    DeadEnd,
    Cycle,
    StepBudget,
    /// The phase did not run at all.
    NoWalker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub steps: usize,
    pub termination: Termination,
}

impl std::default::Default for PhaseSummary {
    fn default() -> Self {
        Self {
            steps: 0,
            termination: Termination::NoWalker,
        }
    }
}

#[derive(Debug, Clone)]
struct Walker {
    current: usize,
    path: Vec<usize>,
    stuck: bool,
}

impl Walker {
    fn new(start: usize) -> Self {
        Self {
            current: start,
            path: vec![start],
            stuck: false,
        }
    }
    fn step(&mut self, table: &GreedyTable) {
        if self.stuck {
            return;
        }
        let next = table.next(self.current);
        if next == self.current {
            self.stuck = true;
        } else {
            self.current = next;
            self.path.push(next);
        }
    }
    fn distinct(&self) -> usize {
        self.path.iter().collect::<HashSet<_>>().len()
    }
}

/// Advance a walker from each of `starts` along `table` until the phase ends.
/// Never takes more than `budget` steps.
pub fn run_phase(
    table: &GreedyTable,
    starts: &[usize],
    budget: usize,
    cycle_check_interval: usize,
) -> (Vec<Vec<usize>>, PhaseSummary) {
    if starts.is_empty() {
        return (vec![], PhaseSummary::default());
    }
    let interval = cycle_check_interval.max(1);
    let mut walkers: Vec<_> = starts.iter().map(|&s| Walker::new(s)).collect();
    let mut steps = 0;
    let termination = loop {
        if budget <= steps {
            break Termination::StepBudget;
        }
        steps += 1;
        walkers.par_iter_mut().for_each(|w| w.step(table));
        if walkers.iter().all(|w| w.stuck) {
            break Termination::DeadEnd;
        }
        if steps % interval == 0 && walkers.par_iter().all(|w| w.distinct() < steps) {
            break Termination::Cycle;
        }
    };
    let paths = walkers.into_iter().map(|w| w.path).collect();
    (paths, PhaseSummary { steps, termination })
}

/// Candidate walks of one routing batch.
#[derive(Debug, Clone, Default)]
pub struct RoutedBatch {
    /// Raw walks in global ids. May contain duplicates.
    pub raw_walks: Vec<Vec<usize>>,
    /// Sanitized walks. Empty if ambiguous.
    pub walks: Vec<Vec<usize>>,
    pub lengths: Vec<usize>,
    pub forward: PhaseSummary,
    pub backward: PhaseSummary,
}

impl RoutedBatch {
    fn single_nodes(node: usize, count: usize) -> Self {
        let walks = vec![vec![node]; count];
        Self {
            raw_walks: walks.clone(),
            lengths: vec![1; count],
            walks,
            ..Default::default()
        }
    }
    /// The first of the longest sanitized walks.
    pub fn best(&self) -> Option<&[usize]> {
        let mut best: Option<usize> = None;
        for (idx, &len) in self.lengths.iter().enumerate() {
            if best.map_or(true, |b| self.lengths[b] < len) {
                best = Some(idx);
            }
        }
        best.map(|idx| self.walks[idx].as_slice())
    }
    pub fn len(&self) -> usize {
        self.walks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }
}

fn seed_weight(score: f64, kind: ScoreKind) -> f64 {
    let prob = match kind {
        ScoreKind::Logit => 1f64 / (1f64 + (-score).exp()),
        ScoreKind::Probability => score.clamp(0f64, 1f64),
    };
    prob.max(MIN_SEED_PROB)
}

/// Sample `count` edge ids with replacement, in proportion to their (floored) probability.
pub fn sample_seed_edges<R: Rng>(
    scores: &[f64],
    kind: ScoreKind,
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    if scores.is_empty() {
        return vec![];
    }
    let weights: Vec<f64> = scores.iter().map(|&s| seed_weight(s, kind)).collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..count).map(|_| dist.sample(rng)).collect(),
        Err(why) => {
            warn!("SEED\tFallback to uniform sampling\t{}", why);
            (0..count).map(|_| rng.gen_range(0..scores.len())).collect()
        }
    }
}

/// Route one walker pair from each of `seeds` (edge ids of `sub`).
pub fn route_from_seeds(
    sub: &SubGraph,
    seeds: &[usize],
    config: &RouterConfig,
) -> Result<RoutedBatch, GraphError> {
    if let Some(&edge) = seeds.iter().find(|&&e| sub.num_edges() <= e) {
        return Err(GraphError::UnknownEdge {
            edge,
            num_edges: sub.num_edges(),
        });
    }
    let scores = sub.graph.scores()?;
    let budget = (sub.num_nodes() / 2).max(1);
    let forward_table = GreedyTable::successors(&sub.graph, &scores);
    let backward_table = GreedyTable::predecessors(&sub.graph, &scores);
    let heads: Vec<_> = seeds.iter().map(|&e| sub.graph.edge(e).to).collect();
    let tails: Vec<_> = seeds.iter().map(|&e| sub.graph.edge(e).from).collect();
    let interval = config.cycle_check_interval;
    let (forward_paths, forward) = run_phase(&forward_table, &heads, budget, interval);
    let (backward_paths, backward) = run_phase(&backward_table, &tails, budget, interval);
    let raw_walks: Vec<Vec<usize>> = backward_paths
        .iter()
        .zip(forward_paths.iter())
        .map(|(back, forth)| {
            back.iter()
                .rev()
                .chain(forth.iter())
                .map(|&n| sub.global_of(n))
                .collect()
        })
        .collect();
    let (walks, lengths) = sanitize_batch(&raw_walks);
    debug!(
        "ROUTE\t{}\t{}\t{:?}\t{}\t{:?}\t{}",
        sub.num_nodes(),
        seeds.len(),
        forward.termination,
        forward.steps,
        backward.termination,
        backward.steps
    );
    Ok(RoutedBatch {
        raw_walks,
        walks,
        lengths,
        forward,
        backward,
    })
}

/// Sample `config.batch_size` seeds and route them.
/// An empty sub-graph gives no candidates, and a sub-graph without edges gives single-node candidates.
pub fn route<R: Rng>(
    sub: &SubGraph,
    config: &RouterConfig,
    rng: &mut R,
) -> Result<RoutedBatch, GraphError> {
    if sub.num_nodes() == 0 {
        return Ok(RoutedBatch::default());
    }
    if sub.num_edges() == 0 {
        return Ok(RoutedBatch::single_nodes(sub.global_of(0), config.batch_size));
    }
    let scores = sub.graph.scores()?;
    let seeds = sample_seed_edges(&scores, config.score_kind, config.batch_size, rng);
    route_from_seeds(sub, &seeds, config)
}
