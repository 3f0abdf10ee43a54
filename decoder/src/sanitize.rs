//! Remove duplicated visits from a raw walk.
//!
//! A raw walk coming from the router may re-enter a region it already visited, typically a repeat.
//! We keep the run of nodes visited exactly once (the central part), then extend it outward by the
//! duplicated nodes as long as each of them is seen for the first time.
//! If the central part is broken by duplicated nodes, or some duplicated node can not be placed,
//! the walk is ambiguous and we return an empty walk. An empty walk should be discarded, not used as a contig.
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Return the duplicate-free walk, or an empty walk if it is ambiguous.
pub fn sanitize_walk(walk: &[usize]) -> Vec<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &node in walk.iter() {
        *counts.entry(node).or_default() += 1;
    }
    if counts.values().all(|&c| c == 1) {
        return walk.to_vec();
    }
    let singletons: Vec<usize> = walk
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| (counts[node] == 1).then_some(idx))
        .collect();
    let (start, end) = match (singletons.first(), singletons.last()) {
        (Some(&start), Some(&end)) => (start, end),
        // No central part.
        _ => return vec![],
    };
    if singletons.len() != end - start + 1 {
        // The central part is disconnected.
        return vec![];
    }
    let mut duplicates: HashSet<usize> = counts
        .iter()
        .filter_map(|(&node, &c)| (1 < c).then_some(node))
        .collect();
    let left = repetitive_pattern(walk[..start].iter().rev(), &mut duplicates);
    let right = repetitive_pattern(walk[end + 1..].iter(), &mut duplicates);
    let clean: Vec<usize> = left
        .into_iter()
        .rev()
        .chain(walk[start..=end].iter().copied())
        .chain(right)
        .collect();
    if clean.len() == counts.len() {
        clean
    } else {
        vec![]
    }
}

// Take nodes while they are in `duplicates`, removing each of them on match.
fn repetitive_pattern<'a, I: Iterator<Item = &'a usize>>(
    flank: I,
    duplicates: &mut HashSet<usize>,
) -> Vec<usize> {
    flank
        .map_while(|node| duplicates.remove(node).then_some(*node))
        .collect()
}

/// Sanitize each walk in parallel. Return the clean walks and their lengths.
pub fn sanitize_batch(walks: &[Vec<usize>]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let clean: Vec<Vec<usize>> = walks.par_iter().map(|w| sanitize_walk(w)).collect();
    let lengths = clean.iter().map(|w| w.len()).collect();
    (clean, lengths)
}
