//! Decoder -- turn per-edge confidence scores into contigs.
//!
//! The entry points are [ContigExtraction](contig_extraction::ContigExtraction) for decoding and
//! [GroundTruthBuilder](ground_truth::GroundTruthBuilder) for the supervision labels.
pub mod baseline;
pub mod contig_extraction;
pub mod extract;
pub mod find_union;
pub mod greedy_router;
pub mod ground_truth;
pub mod sanitize;
pub mod walk_check;
#[macro_use]
extern crate log;

mod error;
pub use contig_extraction::{ContigExtraction, ExtractionConfig, ExtractionResult};
pub use error::DecodeError;
pub use greedy_router::{RouterConfig, ScoreKind};
pub use ground_truth::{GroundTruth, GroundTruthBuilder, GroundTruthConfig, Policy};

/// Minimum sampling probability of an edge. Scores below it are floored so that no edge is locked out.
pub const MIN_SEED_PROB: f64 = 1e-9;
