use crate::common::*;
use crate::npmi::{CoherenceScorer, ReferenceCorpus, NPMI_TOP_N};
use crate::topics::read_topics_file;

use clap::Args;

#[derive(Args, Debug)]
pub struct NpmiArgs {
    #[arg(
        required = true,
        help = "Topic files",
        long_help = "Topic tables written during training, e.g., {out}/topics/topics_10.txt"
    )]
    topics_files: Vec<Box<str>>,

    #[arg(
        long,
        short = 'r',
        required = true,
        help = "Reference corpus directory",
        long_help = "Directory with a `*.mtx` (or `*.mtx.gz`) document x word count file\n\
		     and a `*.json` token-to-column map."
    )]
    ref_directory: Box<str>,

    #[arg(long, short = 'n', default_value_t = NPMI_TOP_N, help = "Words per topic")]
    top_n: usize,

    #[arg(long, short, help = "Verbosity")]
    verbose: bool,
}

/// Print the mean NPMI of each topic file
pub fn score_topic_files(args: &NpmiArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let corpus =
        ReferenceCorpus::from_directory(args.ref_directory.as_ref())?.with_top_n(args.top_n);
    info!("{} reference documents", corpus.num_docs());

    for file in args.topics_files.iter() {
        let topics = read_topics_file(file.as_ref())?;
        let npmi = corpus.score(&topics)?;
        println!("{}\t{:.4}", file, npmi);
    }
    Ok(())
}
