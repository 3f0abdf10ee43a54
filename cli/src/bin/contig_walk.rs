use contig_walk_cli::pipeline::{dump_json, load_graph, to_io_error, PipelineConfig};
use decoder::walk_check::WalkReport;
use decoder::*;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
#[macro_use]
extern crate log;

fn main() -> std::io::Result<()> {
    let matches = contig_walk_cli::commands::contig_walk_parser().get_matches();
    if let Some(("pipeline", sub_m)) = matches.subcommand() {
        let path: &String = sub_m.get_one("profile").unwrap();
        let file = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&file).map_err(to_io_error)?;
        return contig_walk_cli::pipeline::run_pipeline(&config);
    }
    if let Some((_, sub_m)) = matches.subcommand() {
        let level = match sub_m.get_count("verbose") {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
        set_threads(sub_m);
    }
    match matches.subcommand() {
        Some(("decode", sub_m)) => decode(sub_m),
        Some(("truth", sub_m)) => truth(sub_m),
        Some(("baseline", sub_m)) => baseline(sub_m),
        Some(("validate", sub_m)) => validate(sub_m),
        _ => unreachable!(),
    }
}

fn decode(matches: &clap::ArgMatches) -> std::io::Result<()> {
    debug!("START\tDecode");
    let graph: &String = matches.get_one("graph").unwrap();
    let scores = matches.get_one::<String>("scores").map(Path::new);
    let graph = load_graph(Path::new(graph), scores)?;
    let score_kind = match matches.get_one::<String>("score_kind").map(|s| s.as_str()) {
        Some("probability") => ScoreKind::Probability,
        _ => ScoreKind::Logit,
    };
    let batch_size: usize = *matches.get_one("batch_size").unwrap();
    let interval: usize = *matches.get_one("cycle_check_interval").unwrap();
    let router = RouterConfig::new(batch_size, interval, score_kind);
    let len_threshold: usize = *matches.get_one("len_threshold").unwrap();
    let min_remaining: usize = *matches.get_one("min_remaining_nodes").unwrap();
    let seed: u64 = *matches.get_one("seed").unwrap();
    let check_strands = !matches.get_flag("no_strand_check");
    let config = ExtractionConfig::new(router, len_threshold, min_remaining, seed, check_strands);
    let result = graph.extract_contigs(&config).map_err(to_io_error)?;
    info!(
        "DECODE\t{}\t{}",
        result.contigs.walks.len(),
        result.contigs.lengths.iter().max().unwrap_or(&0)
    );
    let output = matches.get_one::<String>("output").map(Path::new);
    dump_json(&result, output)
}

fn truth(matches: &clap::ArgMatches) -> std::io::Result<()> {
    debug!("START\tTruth");
    let graph: &String = matches.get_one("graph").unwrap();
    let graph = load_graph(Path::new(graph), None)?;
    let policy = match matches.get_one::<String>("policy").map(|s| s.as_str()) {
        Some("coverage") => Policy::CoverageSweep,
        _ => Policy::Components,
    };
    let max_dfs_steps = matches.get_one::<usize>("max_dfs_steps").copied();
    let min_component_walk: usize = *matches.get_one("min_component_walk").unwrap();
    let config = GroundTruthConfig::new(policy, max_dfs_steps, min_component_walk);
    let truth = graph.ground_truth(&config).map_err(to_io_error)?;
    let output = matches.get_one::<String>("output").map(Path::new);
    dump_json(&truth, output)
}

fn baseline(matches: &clap::ArgMatches) -> std::io::Result<()> {
    debug!("START\tBaseline");
    let graph: &String = matches.get_one("graph").unwrap();
    let graph = load_graph(Path::new(graph), None)?;
    let walk = decoder::baseline::longest_overlap_greedy(&graph);
    info!("BASELINE\t{}", walk.len());
    let output = matches.get_one::<String>("output").map(Path::new);
    dump_json(&walk, output)
}

fn validate(matches: &clap::ArgMatches) -> std::io::Result<()> {
    debug!("START\tValidate");
    let graph: &String = matches.get_one("graph").unwrap();
    let graph = load_graph(Path::new(graph), None)?;
    graph.check_strand_pairing().map_err(to_io_error)?;
    match graph.scores() {
        Ok(_) => info!("VALIDATE\tScored\t{}", graph.num_edges()),
        Err(why) => info!("VALIDATE\t{}", why),
    }
    let stdout = std::io::stdout();
    let mut wtr = BufWriter::new(stdout.lock());
    writeln!(wtr, "{:?}", graph)?;
    if let Some(path) = matches.get_one::<String>("walks") {
        let rdr = std::fs::File::open(path).map(BufReader::new)?;
        let result: ExtractionResult = serde_json::de::from_reader(rdr).map_err(to_io_error)?;
        writeln!(wtr, "id\tlength\tstrand_switches\toverlap_gaps\tspan")?;
        for (idx, walk) in result.contigs.walks.iter().enumerate() {
            if let Some(&n) = walk.iter().find(|&&n| graph.num_nodes() <= n) {
                return Err(to_io_error(format!("walk {} has unknown node {}", idx, n)));
            }
            writeln!(wtr, "{}\t{}", idx, WalkReport::new(&graph, walk))?;
        }
    }
    wtr.flush()
}

fn set_threads(matches: &clap::ArgMatches) {
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        debug!("Set Threads\t{}", threads);
        if let Err(why) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            debug!("{:?}", why);
        }
    }
}
