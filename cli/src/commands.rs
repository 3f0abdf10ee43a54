use clap::{value_parser, Arg, ArgAction, Command};

fn verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Debug mode")
}

fn threads() -> Arg {
    Arg::new("threads")
        .short('t')
        .long("threads")
        .default_value("1")
        .value_parser(value_parser!(usize))
        .help("number of threads")
}

fn graph() -> Arg {
    Arg::new("graph")
        .short('g')
        .long("graph")
        .value_name("GRAPH")
        .required(true)
        .help("Overlap graph in JSON.")
}

fn output() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .help("Output JSON file. STDOUT if not given.")
}

fn subcommand_decode() -> Command {
    Command::new("decode")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Decode contigs from the scored overlap graph.")
        .arg(verbose())
        .arg(threads())
        .arg(graph())
        .arg(output())
        .arg(
            Arg::new("scores")
                .short('s')
                .long("scores")
                .value_name("SCORES")
                .help("JSON array of edge scores. If not given, the scores on the edges are used."),
        )
        .arg(
            Arg::new("batch_size")
                .short('p')
                .long("batch_size")
                .default_value("100")
                .value_parser(value_parser!(usize))
                .help("Number of candidate walks per iteration."),
        )
        .arg(
            Arg::new("cycle_check_interval")
                .long("cycle_check_interval")
                .default_value("100")
                .value_parser(value_parser!(usize))
                .help("Check for cycles every this many steps."),
        )
        .arg(
            Arg::new("score_kind")
                .long("score_kind")
                .default_value("logit")
                .value_parser(["logit", "probability"])
                .help("Scores are logits or probabilities."),
        )
        .arg(
            Arg::new("len_threshold")
                .short('l')
                .long("len_threshold")
                .default_value("10")
                .value_parser(value_parser!(usize))
                .help("Stop when the best walk is shorter than this."),
        )
        .arg(
            Arg::new("min_remaining_nodes")
                .long("min_remaining_nodes")
                .default_value("10")
                .value_parser(value_parser!(usize))
                .help("Stop when no more than this many nodes remain."),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("42")
                .value_parser(value_parser!(u64))
                .help("Seed of the seed-edge sampling."),
        )
        .arg(
            Arg::new("no_strand_check")
                .long("no_strand_check")
                .action(ArgAction::SetTrue)
                .help("Skip the strand pairing check."),
        )
}

fn subcommand_truth() -> Command {
    Command::new("truth")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Build the reference walks and the correct edges from read positions.")
        .arg(verbose())
        .arg(threads())
        .arg(graph())
        .arg(output())
        .arg(
            Arg::new("policy")
                .long("policy")
                .default_value("components")
                .value_parser(["components", "coverage"])
                .help("One walk per component, or a left-to-right coverage sweep."),
        )
        .arg(
            Arg::new("max_dfs_steps")
                .long("max_dfs_steps")
                .value_parser(value_parser!(usize))
                .help("Maximum number of expansions per DFS."),
        )
        .arg(
            Arg::new("min_component_walk")
                .long("min_component_walk")
                .default_value("10")
                .value_parser(value_parser!(usize))
                .help("Minimum length of the walks other than the longest one."),
        )
}

fn subcommand_baseline() -> Command {
    Command::new("baseline")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Longest greedy walk along the longest overlaps. Scores are not used.")
        .arg(verbose())
        .arg(threads())
        .arg(graph())
        .arg(output())
}

fn subcommand_validate() -> Command {
    Command::new("validate")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Check the strand pairing of the graph and report the decoded walks in TSV.")
        .arg(verbose())
        .arg(threads())
        .arg(graph())
        .arg(
            Arg::new("walks")
                .short('w')
                .long("walks")
                .value_name("WALKS")
                .help("Output of `decode` in JSON."),
        )
}

fn subcommand_pipeline() -> Command {
    Command::new("pipeline")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Run the decoding from a TOML profile.")
        .arg(
            Arg::new("profile")
                .required(true)
                .value_name("TOML")
                .help("TOML configuration file. See demos/profile.toml for an example."),
        )
}

pub fn contig_walk_parser() -> Command {
    Command::new("contig_walk")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Decode contigs from a scored, strand-doubled overlap graph.")
        .arg_required_else_help(true)
        .subcommand(subcommand_decode())
        .subcommand(subcommand_truth())
        .subcommand(subcommand_baseline())
        .subcommand(subcommand_validate())
        .subcommand(subcommand_pipeline())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parser_is_consistent() {
        contig_walk_parser().debug_assert();
    }
    #[test]
    fn decode_defaults() {
        let matches = contig_walk_parser()
            .try_get_matches_from(["contig_walk", "decode", "-g", "graph.json", "-vv"])
            .unwrap();
        let (name, sub_m) = matches.subcommand().unwrap();
        assert_eq!(name, "decode");
        assert_eq!(sub_m.get_count("verbose"), 2);
        assert_eq!(sub_m.get_one::<usize>("batch_size"), Some(&100));
        assert_eq!(
            sub_m.get_one::<String>("score_kind").map(|s| s.as_str()),
            Some("logit")
        );
        assert!(!sub_m.get_flag("no_strand_check"));
        assert!(sub_m.get_one::<String>("scores").is_none());
    }
    #[test]
    fn graph_is_required() {
        let result = contig_walk_parser().try_get_matches_from(["contig_walk", "truth"]);
        assert!(result.is_err());
    }
}
