use lentil::fit_topic::*;
use lentil::score_topics::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Neural variational topic models of bag-of-words documents\n\
		  Count data in matrix market format (`.mtx` or `.mtx.gz`)\n\
		  with one vocabulary token per column."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Fit a topic model",
        long_about = "Fit a logistic-normal topic VAE in the three stages: \n\
		      (1) Read the counts, the vocabulary and optional background frequencies\n\
		      (2) Estimate encoder-decoder parameters via SGD,\n\
		      tracking topics and NPMI once per epoch\n\
		      (3) Write the topic-word matrix and the documents' topic proportions.\n"
    )]
    Fit(FitArgs),

    #[command(
        about = "Score topic files by NPMI",
        long_about = "Compute normalized pointwise mutual information of the top words\n\
		      in each topic table against a reference corpus.\n"
    )]
    Npmi(NpmiArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Fit(args) => {
            fit_topic_model(args)?;
        }
        Commands::Npmi(args) => {
            score_topic_files(args)?;
        }
    }
    Ok(())
}
