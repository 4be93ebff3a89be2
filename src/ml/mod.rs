// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn-specific code that is not plain data handling:
//
//   hooks.rs      — TrainableModel: what a concrete model must
//                   (and may) provide to the harness
//   model.rs      — Model<B, M>: counters, logger, summaries,
//                   checkpoints, construction and restore
//   trainer.rs    — train() / train_step() on Model
//   inferencer.rs — infer() / infer_step() on Model
//
//   vae.rs        — the variational autoencoder
//   mlp.rs        — dense layer stacks (optional BatchNorm)
//   activation.rs — configured activation functions
//   loss.rs       — reconstruction and KL terms
//
// Backends:
//   DefaultBackend is NdArray on the CPU, or Wgpu with the
//   `wgpu` feature. TrainBackend wraps it in Autodiff.
//   model.valid() gives the same network on DefaultBackend,
//   which is what validation and inference run on.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::prelude::*;

/// Hooks a concrete model implements
pub mod hooks;

/// The lifecycle harness
pub mod model;

/// Epoch and mini-batch training loop
pub mod trainer;

/// Batched inference
pub mod inferencer;

/// Variational autoencoder
pub mod vae;

/// Dense layer stacks
pub mod mlp;

/// Activation functions named in configs
pub mod activation;

/// VAE loss terms
pub mod loss;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray<f32>;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<DefaultBackend>;

pub fn default_device() -> <DefaultBackend as Backend>::Device {
    Default::default()
}
