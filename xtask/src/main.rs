use anyhow::Result;
use clap::{Parser, Subcommand};

mod tasks;

#[derive(Parser)]
#[command(
    name = "roadseg",
    about = "Road-scene semantic segmentation toolkit",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fine-tune the segmentation model on paired RGB/mask directories.
    Train(tasks::train::TrainArgs),
    /// Predict the mask channel for a single image from a saved checkpoint.
    Predict(tasks::predict::PredictArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Train(args) => tasks::train::run(args),
        Commands::Predict(args) => tasks::predict::run(args),
    }
}
