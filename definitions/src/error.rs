use thiserror::Error;

/// Violations of the structural invariants of an [OverlapGraph](crate::OverlapGraph).
/// These are not recoverable: a decoding run should stop with the message.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {edge} ({from}->{to}) points outside of the graph with {num_nodes} nodes")]
    EdgeOutOfRange {
        edge: usize,
        from: usize,
        to: usize,
        num_nodes: usize,
    },
    #[error("edge {edge} does not exist in the graph with {num_edges} edges")]
    UnknownEdge { edge: usize, num_edges: usize },
    #[error("edge {edge} has no score. Annotate the scores before decoding")]
    MissingScore { edge: usize },
    #[error("{scores} scores are given, but the graph has {edges} edges")]
    ScoreLengthMismatch { scores: usize, edges: usize },
    #[error("the score of edge {edge} is NaN")]
    InvalidScore { edge: usize },
    #[error("strand-doubled graph should have an even number of nodes, found {0}")]
    OddNodeCount(usize),
    #[error("node {node} and its partner {partner} are on the same strand")]
    StrandMismatch { node: usize, partner: usize },
    #[error("edge {edge} has no mirrored edge {from}->{to} on the opposite strand")]
    MissingMirrorEdge { edge: usize, from: usize, to: usize },
    #[error("could not parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
