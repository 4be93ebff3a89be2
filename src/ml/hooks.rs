// ============================================================
// Layer 5 — Model Hooks
// ============================================================
// The harness (Model) knows how to run epochs, batch indices,
// write summaries and checkpoints. It does not know what the
// network is or how a loss is computed. A concrete model fills
// that in by implementing TrainableModel:
//
//   required
//     build               — create the network and optimizer
//     run_update_and_loss — one gradient step, returns the loss
//     run_loss            — loss without updating (validation)
//     run_output          — forward pass for inference
//     net / set_net       — access to the parameter module
//
//   optional (defaults do nothing special)
//     load_data           — return data to stream from instead
//                           of taking arrays in train()
//     on_epoch_done       — after every train()
//     on_train_step_done  — after every train_step()
//     save_variables /
//     restore_variables   — what goes into a snapshot (the
//                           whole network by default)
//
// Extra per-call arguments (learning rate, β, ...) are the
// model's own `Args` type; the harness passes them through
// untouched.
//
// Reference: Rust Book §10 (Traits: Default Implementations)

use anyhow::Result;
use std::path::Path;
use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

use crate::data::{batcher::Batch, dataset::TrainingData};
use crate::domain::traits::Settings;
use crate::infra::checkpoint::{load_module, save_module};

pub trait TrainableModel<B: AutodiffBackend>: Sized {
    /// Config the model is built from (carries the shared ModelConfig)
    type Config: Settings;
    /// Runtime arguments forwarded to every hook call
    type Args;
    /// The parameter module saved in snapshots
    type Net: AutodiffModule<B>;

    fn build(config: &Self::Config, device: &B::Device) -> Result<Self>;

    /// Training (and optional validation) data to stream
    /// mini-batches from. `None` means train() takes arrays.
    fn load_data(_config: &Self::Config, _device: &B::Device) -> Result<Option<TrainingData<B>>> {
        Ok(None)
    }

    fn run_update_and_loss(&mut self, batch: Batch<B>, args: &Self::Args) -> Result<f64>;

    fn run_loss(&self, batch: Batch<B>, args: &Self::Args) -> Result<f64>;

    /// Shape: [N, in] → [N, out], evaluated without autodiff
    fn run_output(
        &self,
        inputs: Tensor<B, 2>,
        args:   &Self::Args,
    ) -> Result<Tensor<B::InnerBackend, 2>>;

    fn on_epoch_done(&mut self, _epoch: u64) {}

    fn on_train_step_done(&mut self, _step: u64) {}

    fn net(&self) -> &Self::Net;

    fn set_net(&mut self, net: Self::Net);

    /// Write a snapshot of the model's parameters.
    fn save_variables(&self, path: &Path) -> Result<()> {
        save_module(self.net().clone(), path)
    }

    /// Load a snapshot written by [`TrainableModel::save_variables`].
    fn restore_variables(&mut self, path: &Path, device: &B::Device) -> Result<()> {
        let net = load_module(self.net().clone(), path, device)?;
        self.set_net(net);
        Ok(())
    }
}
