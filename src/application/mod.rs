// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer strings the other layers together for one goal
// (training a VAE, or evaluating a trained one).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Rust Book §7 (Module System)

/// Fit a VAE to synthetic surface data
pub mod train_use_case;

/// Restore a trained VAE and measure its reconstructions
pub mod infer_use_case;
