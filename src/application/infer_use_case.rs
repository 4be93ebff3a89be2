// ============================================================
// Layer 2 — InferUseCase
// ============================================================
// Loads a trained VAE back from its run directory and reports
// how well it reconstructs fresh surface points:
//
//   Step 1: Read <run>/config.json       (Layer 3 - domain)
//   Step 2: Rebuild the network          (Layer 5 - ml)
//   Step 3: Load the newest snapshot     (Layer 6 - infra)
//   Step 4: Reconstruct new samples,     (Layer 5 - ml)
//           scaled with the training run's statistics
//   Step 5: Reconstruction error and the average σ of every
//           latent unit (units the VAE does not use stay
//           close to σ = 1)
//
// Summaries and new checkpoint directories are switched off
// for the rebuilt model so inference leaves no files behind.

use anyhow::{Context, Result};
use std::path::PathBuf;
use burn::prelude::*;

use crate::data::{
    stream::make_rng,
    synthetic::{self, ColumnScaling, SCALING_FILE},
};
use crate::domain::traits::Settings;
use crate::infra::checkpoint::CONFIG_FILE;
use crate::ml::{
    default_device,
    vae::{VaeArgs, VaeConfig, VaeModel},
    TrainBackend,
};

#[derive(Debug, Clone)]
pub struct InferConfig {
    /// Run directory written by `train`
    pub run_dir:    PathBuf,
    pub samples:    usize,
    pub batch_size: Option<usize>,
    pub seed:       Option<u64>,
}

/// Outcome of an inference run.
#[derive(Debug, Clone)]
pub struct InferReport {
    pub rows:               usize,
    /// Mean squared difference per coordinate
    pub reconstruction_mse: f64,
    /// Average σ of every latent unit
    pub mean_sigma:         Vec<f32>,
}

pub struct InferUseCase {
    config: InferConfig,
}

impl InferUseCase {
    pub fn new(config: InferConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<InferReport> {
        let cfg    = &self.config;
        let device = default_device();

        // ── Steps 1-3: model ──────────────────────────────────────────────────
        let config_path = cfg.run_dir.join(CONFIG_FILE);
        let mut vae_config = VaeConfig::try_load(&config_path)
            .with_context(|| format!("Cannot read model config from '{}'", cfg.run_dir.display()))?;
        vae_config.model.checkpoints_root = None;
        vae_config.model.summaries_root   = None;
        vae_config.model.log_file         = None;

        let mut model = VaeModel::<TrainBackend>::new(vae_config, &device)?;
        model.restore_latest(&cfg.run_dir)?;
        tracing::info!("Restored model from '{}'", cfg.run_dir.display());

        // ── Step 4: reconstruct ───────────────────────────────────────────────
        let scaling = ColumnScaling::load(&cfg.run_dir.join(SCALING_FILE))?;
        let mut points = synthetic::surface_samples(cfg.samples, &mut make_rng(cfg.seed));
        scaling.apply(&mut points);
        let inputs = synthetic::rows_to_tensor::<TrainBackend>(&points, &device);

        let output = model.infer(&inputs, cfg.batch_size, &VaeArgs::default())?;
        let rows   = output.dims()[0];

        // ── Step 5: report ────────────────────────────────────────────────────
        let targets = inputs.clone().inner().slice([0..rows, 0..3]);
        let diff    = targets - output;
        let reconstruction_mse = (diff.clone() * diff).mean().into_scalar().elem::<f64>();

        let (_, sigma) = model.inner().latent_statistics(inputs.inner());
        let mean_sigma = sigma
            .mean_dim(0)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read latent statistics: {e:?}"))?;

        Ok(InferReport { rows, reconstruction_mse, mean_sigma })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};

    #[test]
    fn test_infer_after_train() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = TrainConfig {
            samples:          50,
            epochs:           1,
            batch_size:       10,
            latent_size:      2,
            n_hidden:         vec![6],
            checkpoints_root: tmp.path().to_path_buf(),
            seed:             Some(4),
            ..TrainConfig::default()
        };
        let run_dir = TrainUseCase::new(train).execute().unwrap().run_dir.unwrap();

        let report = InferUseCase::new(InferConfig {
            run_dir,
            samples:    20,
            batch_size: Some(8),
            seed:       Some(5),
        })
        .execute()
        .unwrap();

        assert_eq!(report.rows, 16);
        assert!(report.reconstruction_mse.is_finite());
        assert_eq!(report.mean_sigma.len(), 2);
    }

    #[test]
    fn test_run_without_scaling_is_rejected() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = TrainConfig {
            samples:          30,
            epochs:           1,
            batch_size:       6,
            latent_size:      2,
            n_hidden:         vec![4],
            checkpoints_root: tmp.path().to_path_buf(),
            seed:             Some(8),
            ..TrainConfig::default()
        };
        let run_dir = TrainUseCase::new(train).execute().unwrap().run_dir.unwrap();
        std::fs::remove_file(run_dir.join(SCALING_FILE)).unwrap();

        let res = InferUseCase::new(InferConfig {
            run_dir,
            samples:    10,
            batch_size: None,
            seed:       Some(1),
        })
        .execute();
        assert!(res.is_err());
    }

    #[test]
    fn test_missing_run_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let res = InferUseCase::new(InferConfig {
            run_dir:    tmp.path().join("7"),
            samples:    10,
            batch_size: None,
            seed:       None,
        })
        .execute();
        assert!(res.is_err());
    }
}
