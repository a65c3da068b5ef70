use clap::Parser;
use glove_trainer::{Config, Pipeline};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};


/// Train GloVe word vectors from a corpus, as described by a json config file
#[derive(Parser)]
#[command(name = "glove")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the json config (corpus_file, output_dir and hyper parameters)
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("building parameters...");
    let params = Config::from_file(&cli.config)?.get_params();
    Pipeline::run(&params)?;

    Ok(())
}
