// ============================================================
// Layer 4 — Synthetic Surface Data
// ============================================================
// Demo data for the VAE: points (x, y, z) on the surface
//
//   z = (sin 10x + cos 10y) · exp(−((x−½)² + (y−½)²) / 0.1)
//
// with x, y uniform in [0, 1). The points live in 3-D but are
// generated by two numbers, so a VAE with a few latent units
// should learn a (roughly) 2-D code for them.
//
// Columns are standardised (zero mean, unit std) before use.
// The statistics fitted on the training points are stored next
// to the snapshots (scaling.json) so that evaluation scales new
// points the same way.

use anyhow::{Context, Result};
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// File name of the stored column statistics inside a run dir
pub const SCALING_FILE: &str = "scaling.json";

/// Height of the surface at (x, y).
pub fn surface_height(x: f32, y: f32) -> f32 {
    let bump = -((x - 0.5).powi(2) + (y - 0.5).powi(2)) / 0.1;
    ((10.0 * x).sin() + (10.0 * y).cos()) * bump.exp()
}

/// `n` random points on the surface.
pub fn surface_samples<R: Rng>(n: usize, rng: &mut R) -> Vec<[f32; 3]> {
    (0..n)
        .map(|_| {
            let x: f32 = rng.gen();
            let y: f32 = rng.gen();
            [x, y, surface_height(x, y)]
        })
        .collect()
}

/// Points on a regular `steps × steps` grid over [0, 1]².
pub fn surface_grid(steps: usize) -> Vec<[f32; 3]> {
    let denom = steps.saturating_sub(1).max(1) as f32;
    let mut rows = Vec::with_capacity(steps * steps);
    for i in 0..steps {
        for j in 0..steps {
            let x = j as f32 / denom;
            let y = i as f32 / denom;
            rows.push([x, y, surface_height(x, y)]);
        }
    }
    rows
}

// ─── ColumnScaling ────────────────────────────────────────────────────────────
/// Per-column mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaling {
    pub mean: [f32; 3],
    pub std:  [f32; 3],
}

impl ColumnScaling {
    /// Statistics of `rows`. An empty slice gives the identity.
    pub fn fit(rows: &[[f32; 3]]) -> Self {
        if rows.is_empty() {
            return Self { mean: [0.0; 3], std: [1.0; 3] };
        }
        let n = rows.len() as f32;
        let mut mean = [0.0; 3];
        let mut std  = [0.0; 3];
        for col in 0..3 {
            mean[col] = rows.iter().map(|r| r[col]).sum::<f32>() / n;
            let var   = rows.iter().map(|r| (r[col] - mean[col]).powi(2)).sum::<f32>() / n;
            std[col]  = var.sqrt();
        }
        Self { mean, std }
    }

    /// Shift and scale every column. Constant columns are only centred.
    pub fn apply(&self, rows: &mut [[f32; 3]]) {
        for r in rows.iter_mut() {
            for col in 0..3 {
                r[col] -= self.mean[col];
                if self.std[col] > 0.0 {
                    r[col] /= self.std[col];
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write column scaling to '{}'", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read column scaling from '{}'", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Standardise `rows` in place to zero mean and unit standard
/// deviation, returning the statistics used.
pub fn standardize(rows: &mut [[f32; 3]]) -> ColumnScaling {
    let scaling = ColumnScaling::fit(rows);
    scaling.apply(rows);
    scaling
}

/// Stack rows into a [N, 3] tensor.
pub fn rows_to_tensor<B: Backend>(rows: &[[f32; 3]], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::<B, 2>::from_data(TensorData::new(flat, [rows.len(), 3]), device)
}
