// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Fits a VAE to points sampled from a 3-D surface:
//
//   Step 1: Sample surface points        (Layer 4 - data)
//   Step 2: Standardise the columns      (Layer 4 - data)
//   Step 3: Split train/validation       (Layer 4 - data)
//   Step 4: Build the model              (Layer 5 - ml)
//   Step 5: Run `epochs` train() calls   (Layer 5 - ml)
//   Step 6: Save a final snapshot and    (Layer 6 - infra)
//           the column scaling
//
// The run directory printed at the end is what the `infer`
// command takes.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{
    dataset::{Split, TrainingData},
    splitter::split_train_val,
    stream::make_rng,
    synthetic,
};
use crate::domain::{
    callable::{Activation, Callable, OptimizerKind, ReconstructionLoss},
    config::ModelConfig,
};
use crate::ml::{
    default_device,
    vae::{VaeArgs, VaeConfig, VaeModel},
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub samples:             usize,
    pub train_fraction:      f64,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    pub beta:                f64,
    pub latent_size:         usize,
    pub n_hidden:            Vec<usize>,
    pub hidden_activation:   Activation,
    pub optimizer:           OptimizerKind,
    pub reconstruction_loss: ReconstructionLoss,
    pub use_bn:              bool,
    pub checkpoints_root:    PathBuf,
    pub summaries_root:      Option<PathBuf>,
    pub saver_interval:      Option<u64>,
    pub log_file:            Option<PathBuf>,
    pub seed:                Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            samples:             10_000,
            train_fraction:      0.8,
            epochs:              100,
            batch_size:          100,
            learning_rate:       1e-3,
            beta:                0.01,
            latent_size:         5,
            n_hidden:            vec![150, 150],
            hidden_activation:   Activation::Relu,
            optimizer:           OptimizerKind::Adam,
            reconstruction_loss: ReconstructionLoss::MeanOfSquaredDifferences,
            use_bn:              false,
            checkpoints_root:    PathBuf::from("checkpoints"),
            summaries_root:      None,
            saver_interval:      Some(10),
            log_file:            None,
            seed:                None,
        }
    }
}

impl TrainConfig {
    /// Model config for this run.
    pub fn vae_config(&self) -> VaeConfig {
        let defaults = VaeConfig::default();
        VaeConfig {
            model: ModelConfig {
                checkpoints_root: Some(self.checkpoints_root.clone()),
                summaries_root:   self.summaries_root.clone(),
                saver_interval:   self.saver_interval,
                log_file:         self.log_file.clone(),
                seed:             self.seed,
                ..defaults.model
            },
            in_size:             3,
            latent_size:         self.latent_size,
            n_hidden:            self.n_hidden.clone(),
            hidden_activation:   Callable(self.hidden_activation),
            output_activation:   None,
            optimizer:           Callable(self.optimizer),
            use_bn:              self.use_bn,
            reconstruction_loss: Callable(self.reconstruction_loss),
        }
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs:      u64,
    pub train_loss:  f64,
    pub valid_loss:  f64,
    /// Run directory holding config.json and the snapshots
    pub run_dir:     Option<PathBuf>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg    = &self.config;
        let device = default_device();
        let mut rng = make_rng(cfg.seed);

        // ── Steps 1-3: data ───────────────────────────────────────────────────
        let mut points = synthetic::surface_samples(cfg.samples, &mut rng);
        let scaling    = synthetic::standardize(&mut points);
        let (train_rows, valid_rows) = split_train_val(points, cfg.train_fraction, &mut rng);
        tracing::info!(
            "Generated {} surface points ({} train, {} validation)",
            cfg.samples,
            train_rows.len(),
            valid_rows.len(),
        );

        let train = Split::autoencoding(synthetic::rows_to_tensor::<TrainBackend>(&train_rows, &device));
        let validation = (!valid_rows.is_empty())
            .then(|| Split::autoencoding(synthetic::rows_to_tensor::<TrainBackend>(&valid_rows, &device)));
        let data = TrainingData::new(train, validation);

        // ── Step 4: model ─────────────────────────────────────────────────────
        let mut model = VaeModel::<TrainBackend>::new(cfg.vae_config(), &device)?;
        let args = VaeArgs { learning_rate: cfg.learning_rate, beta: cfg.beta };

        // ── Step 5: epochs ────────────────────────────────────────────────────
        let mut losses = (f64::NAN, f64::NAN);
        for _ in 0..cfg.epochs {
            losses = model.train(Some(&data), Some(cfg.batch_size), &args)?;
        }

        // ── Step 6: final snapshot ────────────────────────────────────────────
        model.save()?;
        model.close()?;
        if let Some(dir) = model.checkpoint_dir() {
            scaling.save(&dir.join(synthetic::SCALING_FILE))?;
        }

        Ok(TrainReport {
            epochs:     model.epoch(),
            train_loss: losses.0,
            valid_loss: losses.1,
            run_dir:    model.checkpoint_dir().map(|p| p.to_path_buf()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vae_config_carries_run_settings() {
        let cfg = TrainConfig {
            latent_size: 3,
            seed:        Some(9),
            use_bn:      true,
            ..TrainConfig::default()
        };
        let vae = cfg.vae_config();
        assert_eq!(vae.latent_size, 3);
        assert_eq!(vae.model.seed, Some(9));
        assert_eq!(vae.model.checkpoints_root, Some(PathBuf::from("checkpoints")));
        assert!(vae.use_bn);
        assert!(vae.validate().is_ok());
    }

    #[test]
    fn test_small_run_writes_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            samples:          60,
            epochs:           2,
            batch_size:       12,
            n_hidden:         vec![8],
            checkpoints_root: tmp.path().to_path_buf(),
            saver_interval:   None,
            seed:             Some(1),
            ..TrainConfig::default()
        };

        let report  = TrainUseCase::new(cfg).execute().unwrap();
        let run_dir = report.run_dir.unwrap();
        assert_eq!(report.epochs, 2);
        assert!(report.train_loss.is_finite());
        assert!(run_dir.join("config.json").is_file());
        assert!(run_dir.join("model-2.mpk").is_file());
        assert!(run_dir.join(synthetic::SCALING_FILE).is_file());
    }
}
