// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `infer`, and their
// flags.
//
// Function-valued flags (--activation, --optimizer, --loss)
// take the same names config.json uses, e.g. `--activation
// tanh` or `--loss sum_of_squared_differences`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{infer_use_case::InferConfig, train_use_case::TrainConfig};
use crate::domain::callable::{Activation, NamedCallable, OptimizerKind, ReconstructionLoss};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a VAE on synthetic 3-D surface data
    Train(TrainArgs),

    /// Restore a trained VAE and report its reconstruction error
    Infer(InferArgs),
}

/// Parse a registry name (as written in config files).
fn parse_named<T: NamedCallable>(name: &str) -> Result<T, String> {
    T::resolve(name).ok_or_else(|| format!("unknown {} '{name}'", T::MODULE))
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of surface points to generate
    #[arg(long, default_value_t = 10_000)]
    pub samples: usize,

    /// Share of the points used for training (the rest validate)
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Weight of the KL term
    #[arg(long, default_value_t = 0.01)]
    pub beta: f64,

    #[arg(long, default_value_t = 5)]
    pub latent_size: usize,

    /// Encoder layer widths, e.g. --n-hidden 150,150
    #[arg(long, value_delimiter = ',', default_value = "150,150")]
    pub n_hidden: Vec<usize>,

    #[arg(long, value_parser = parse_named::<Activation>, default_value = "relu")]
    pub activation: Activation,

    #[arg(long, value_parser = parse_named::<OptimizerKind>, default_value = "adam")]
    pub optimizer: OptimizerKind,

    #[arg(long, value_parser = parse_named::<ReconstructionLoss>, default_value = "mean_of_squared_differences")]
    pub loss: ReconstructionLoss,

    /// Batch-normalise every dense layer
    #[arg(long)]
    pub use_bn: bool,

    /// Root of the numbered run directories
    #[arg(long, default_value = "checkpoints")]
    pub checkpoints_root: PathBuf,

    /// Write summaries.csv under this root
    #[arg(long)]
    pub summaries_root: Option<PathBuf>,

    /// Snapshot every N epochs (a final snapshot is always written)
    #[arg(long)]
    pub saver_interval: Option<u64>,

    /// Mirror the model's log into this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            samples:             a.samples,
            train_fraction:      a.train_fraction,
            epochs:              a.epochs,
            batch_size:          a.batch_size,
            learning_rate:       a.lr,
            beta:                a.beta,
            latent_size:         a.latent_size,
            n_hidden:            a.n_hidden,
            hidden_activation:   a.activation,
            optimizer:           a.optimizer,
            reconstruction_loss: a.loss,
            use_bn:              a.use_bn,
            checkpoints_root:    a.checkpoints_root,
            summaries_root:      a.summaries_root,
            saver_interval:      a.saver_interval,
            log_file:            a.log_file,
            seed:                a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct InferArgs {
    /// Run directory printed by `train` (e.g. checkpoints/0)
    #[arg(long)]
    pub run_dir: PathBuf,

    /// Number of fresh surface points to reconstruct
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Mini-batch size; all points at once when omitted
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            run_dir:    a.run_dir,
            samples:    a.samples,
            batch_size: a.batch_size,
            seed:       a.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_parse() {
        let cli = Cli::try_parse_from([
            "modellib", "train", "--epochs", "3", "--n-hidden", "32,16",
            "--activation", "tanh", "--optimizer", "sgd", "--use-bn",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.n_hidden, vec![32, 16]);
        assert_eq!(cfg.hidden_activation, Activation::Tanh);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert!(cfg.use_bn);
    }

    #[test]
    fn test_unknown_activation_is_rejected() {
        let res = Cli::try_parse_from(["modellib", "train", "--activation", "softsign"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_infer_requires_run_dir() {
        assert!(Cli::try_parse_from(["modellib", "infer"]).is_err());
        let cli = Cli::try_parse_from(["modellib", "infer", "--run-dir", "checkpoints/0"]).unwrap();
        assert!(matches!(cli.command, Commands::Infer(_)));
    }
}
