// ============================================================
// Layer 5 — VAE Losses
// ============================================================
// Both terms are computed per sample ([batch] vectors) and only
// averaged over the batch after they are added:
//
//   loss = mean_i( recon_i + kl_i )
//
// Reconstruction (per row i, over the feature axis):
//   sum_of_squared_differences  — Σ_j (y_ij − ŷ_ij)²
//   mean_of_squared_differences — the same divided by #features
//
// KL divergence of N(μ, σ²) from N(0, 1), weighted by β:
//
//   kl_i = ½ · β · Σ_j ( −1 − log σ²_ij + μ²_ij + σ²_ij )
//
// log σ² is passed in already ε-guarded (see vae.rs), so σ = 0
// gives a large but finite term, never NaN or ∞.
//
// Reference: Kingma & Welling (2014) Auto-Encoding Variational Bayes

use burn::prelude::*;

use crate::domain::callable::ReconstructionLoss;

fn squared_difference<B: Backend>(targets: Tensor<B, 2>, outputs: Tensor<B, 2>) -> Tensor<B, 2> {
    let diff = targets - outputs;
    diff.clone() * diff
}

/// Per-sample reconstruction loss. Shape: [batch, in] → [batch]
pub fn reconstruction<B: Backend>(
    kind:    ReconstructionLoss,
    targets: Tensor<B, 2>,
    outputs: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, _] = targets.dims();
    let sq = squared_difference(targets, outputs);
    let per_sample = match kind {
        ReconstructionLoss::SumOfSquaredDifferences  => sq.sum_dim(1),
        ReconstructionLoss::MeanOfSquaredDifferences => sq.mean_dim(1),
    };
    per_sample.reshape([batch])
}

/// Per-sample β-weighted KL term. Shape: [batch, latent] → [batch]
pub fn kl_divergence<B: Backend>(
    mean:         Tensor<B, 2>,
    sigma_sq:     Tensor<B, 2>,
    log_sigma_sq: Tensor<B, 2>,
    beta:         f64,
) -> Tensor<B, 1> {
    let [batch, _] = mean.dims();
    let terms = mean.clone() * mean - log_sigma_sq + sigma_sq - 1.0;
    (terms.sum_dim(1) * (0.5 * beta)).reshape([batch])
}

/// Batch mean of reconstruction + KL. Shape: [1]
pub fn vae_loss<B: Backend>(reconstruction: Tensor<B, 1>, kl: Tensor<B, 1>) -> Tensor<B, 1> {
    (reconstruction + kl).mean()
}
