//! Pipelines -- decode a scored graph in one run.
//!
//! The profile is a TOML file deserialized into [PipelineConfig]. The outputs are written under
//! `out_dir`, named after `prefix`.
use decoder::baseline::longest_overlap_greedy;
use decoder::walk_check::WalkReport;
use decoder::*;
use definitions::{scores_from_reader, OverlapGraph};
use log::*;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The configuration of the pipeline.
/// Parameters not listed here are fixed to the values of the decoder.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineConfig {
    /// The path to the overlap graph.
    graph: PathBuf,
    /// The path to the edge scores. If absent, the scores on the edges are used.
    #[serde(default)]
    scores: Option<PathBuf>,
    /// The path to the output directory.
    out_dir: PathBuf,
    prefix: String,
    verbose: usize,
    threads: usize,
    seed: u64,
    batch_size: usize,
    cycle_check_interval: usize,
    score_kind: ScoreKind,
    len_threshold: usize,
    min_remaining_nodes: usize,
    check_strands: bool,
    /// Also build the ground truth.
    #[serde(default)]
    ground_truth: bool,
    #[serde(default = "default_policy")]
    truth_policy: Policy,
    #[serde(default)]
    max_dfs_steps: Option<usize>,
    #[serde(default = "default_min_component_walk")]
    min_component_walk: usize,
    /// Also run the overlap-length baseline.
    #[serde(default)]
    baseline: bool,
}

fn default_policy() -> Policy {
    Policy::Components
}

fn default_min_component_walk() -> usize {
    decoder::ground_truth::MIN_COMPONENT_WALK
}

impl PipelineConfig {
    pub fn extraction_config(&self) -> ExtractionConfig {
        let router = RouterConfig::new(
            self.batch_size,
            self.cycle_check_interval,
            self.score_kind,
        );
        ExtractionConfig::new(
            router,
            self.len_threshold,
            self.min_remaining_nodes,
            self.seed,
            self.check_strands,
        )
    }
    pub fn ground_truth_config(&self) -> GroundTruthConfig {
        GroundTruthConfig::new(
            self.truth_policy,
            self.max_dfs_steps,
            self.min_component_walk,
        )
    }
}

pub fn run_pipeline(config: &PipelineConfig) -> std::io::Result<()> {
    let level = match config.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
    {
        warn!("{:?}", why);
    }
    std::fs::create_dir_all(&config.out_dir)?;
    let file_stem = config.out_dir.join(&config.prefix);
    let graph = load_graph(&config.graph, config.scores.as_deref())?;
    debug!("GRAPH\t{:?}", graph);
    let result = graph
        .extract_contigs(&config.extraction_config())
        .map_err(to_io_error)?;
    info!(
        "PIPELINE\tContigs\t{}\t{}",
        result.contigs.walks.len(),
        result.contigs.lengths.iter().sum::<usize>()
    );
    dump_json(&result, Some(&file_stem.with_extension("contigs.json")))?;
    let mut report =
        std::fs::File::create(file_stem.with_extension("report.tsv")).map(BufWriter::new)?;
    writeln!(report, "id\tlength\tstrand_switches\toverlap_gaps\tspan")?;
    for (idx, walk) in result.contigs.walks.iter().enumerate() {
        writeln!(report, "{}\t{}", idx, WalkReport::new(&graph, walk))?;
    }
    if config.ground_truth {
        let truth = graph
            .ground_truth(&config.ground_truth_config())
            .map_err(to_io_error)?;
        dump_json(&truth, Some(&file_stem.with_extension("truth.json")))?;
    }
    if config.baseline {
        let walk = longest_overlap_greedy(&graph);
        info!("PIPELINE\tBaseline\t{}", walk.len());
        dump_json(&walk, Some(&file_stem.with_extension("baseline.json")))?;
    }
    Ok(())
}

/// Log the error and convert it into an I/O error.
pub fn to_io_error<E: std::fmt::Display>(why: E) -> std::io::Error {
    error!("{}", why);
    std::io::Error::new(std::io::ErrorKind::Other, why.to_string())
}

/// Open the graph, and annotate it with the scores if `scores` is given.
pub fn load_graph(graph: &Path, scores: Option<&Path>) -> std::io::Result<OverlapGraph> {
    debug!("Opening {:?}", graph);
    let rdr = std::fs::File::open(graph).map(BufReader::new)?;
    let mut graph = OverlapGraph::from_reader(rdr).map_err(to_io_error)?;
    if let Some(path) = scores {
        debug!("Opening {:?}", path);
        let rdr = std::fs::File::open(path).map(BufReader::new)?;
        let scores = scores_from_reader(rdr).map_err(to_io_error)?;
        graph.annotate_scores(&scores).map_err(to_io_error)?;
    }
    Ok(graph)
}

/// Write `value` in JSON into `path`, or STDOUT if `path` is `None`.
pub fn dump_json<T: Serialize>(value: &T, path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            let mut wtr = std::fs::File::create(path).map(BufWriter::new)?;
            serde_json::ser::to_writer(&mut wtr, value).map_err(to_io_error)?;
            wtr.flush()
        }
        None => {
            let stdout = std::io::stdout();
            let mut wtr = BufWriter::new(stdout.lock());
            serde_json::ser::to_writer(&mut wtr, value).map_err(to_io_error)?;
            wtr.flush()
        }
    }
}
