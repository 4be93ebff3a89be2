// Test double for the harness. MockModel does no learning:
// its losses are the batch sizes (training) and 100 + batch
// size (validation), and run_output returns its inputs, so the
// tests can see exactly which rows each hook received.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArray, Autodiff},
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::Batch,
    dataset::{Split, TrainingData},
};
use crate::domain::{config::ModelConfig, traits::Settings};
use crate::ml::hooks::TrainableModel;

pub type TestBackend         = NdArray<f32>;
pub type TestAutodiffBackend = Autodiff<TestBackend>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    #[serde(flatten)]
    pub model:           ModelConfig,
    pub label:           String,
    /// Stream this many rows from load_data instead of taking arrays
    pub stream_rows:     Option<usize>,
    pub with_validation: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model:           ModelConfig { log_level: crate::domain::config::LogLevel::Warn, ..ModelConfig::default() },
            label:           "mock".to_string(),
            stream_rows:     None,
            with_validation: false,
        }
    }
}

impl Settings for MockConfig {
    fn model(&self) -> &ModelConfig {
        &self.model
    }
}

pub struct MockModel<B: AutodiffBackend> {
    pub net:         Linear<B>,
    pub train_rows:  Vec<usize>,
    pub epochs_done: Vec<u64>,
    pub steps_done:  Vec<u64>,
}

impl<B: AutodiffBackend> TrainableModel<B> for MockModel<B> {
    type Config = MockConfig;
    type Args   = ();
    type Net    = Linear<B>;

    fn build(_config: &MockConfig, device: &B::Device) -> Result<Self> {
        Ok(Self {
            net:         LinearConfig::new(2, 2).init(device),
            train_rows:  Vec::new(),
            epochs_done: Vec::new(),
            steps_done:  Vec::new(),
        })
    }

    fn load_data(config: &MockConfig, device: &B::Device) -> Result<Option<TrainingData<B>>> {
        let Some(rows) = config.stream_rows else { return Ok(None) };
        let train = Split::autoencoding(Tensor::zeros([rows, 2], device));
        let validation = config
            .with_validation
            .then(|| Split::autoencoding(Tensor::zeros([rows, 2], device)));
        Ok(Some(TrainingData::new(train, validation)))
    }

    fn run_update_and_loss(&mut self, batch: Batch<B>, _args: &()) -> Result<f64> {
        self.train_rows.push(batch.len());
        Ok(batch.len() as f64)
    }

    fn run_loss(&self, batch: Batch<B>, _args: &()) -> Result<f64> {
        Ok(100.0 + batch.len() as f64)
    }

    fn run_output(&self, inputs: Tensor<B, 2>, _args: &()) -> Result<Tensor<B::InnerBackend, 2>> {
        Ok(inputs.inner())
    }

    fn on_epoch_done(&mut self, epoch: u64) {
        self.epochs_done.push(epoch);
    }

    fn on_train_step_done(&mut self, step: u64) {
        self.steps_done.push(step);
    }

    fn net(&self) -> &Linear<B> {
        &self.net
    }

    fn set_net(&mut self, net: Linear<B>) {
        self.net = net;
    }
}
