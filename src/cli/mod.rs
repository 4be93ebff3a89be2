// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and hands off to
// Layer 2 (application). Printing results happens here and
// nowhere else.
//
//   1. `train` — fit a VAE to synthetic surface data
//   2. `infer` — restore a trained run and evaluate it
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "modellib",
    version = "0.1.0",
    about = "Train a variational autoencoder with the modellib harness, then evaluate a saved run."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Infer(args) => run_infer(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training for {} epochs on {} samples", args.epochs, args.samples);
    let report = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Trained {} epochs: train loss {:.5}, validation loss {:.5}",
        report.epochs, report.train_loss, report.valid_loss,
    );
    if let Some(dir) = report.run_dir {
        println!("Checkpoints: {}", dir.display());
    }
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    let report = InferUseCase::new(args.into()).execute()?;

    println!("Reconstructed {} points, MSE {:.5}", report.rows, report.reconstruction_mse);
    for (unit, sigma) in report.mean_sigma.iter().enumerate() {
        println!("  latent {unit}: mean sigma {sigma:.4}");
    }
    Ok(())
}
