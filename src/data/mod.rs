// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "rows of numbers" and "a mini-batch a
// model hook can consume".
//
//   array mode (caller passes tensors to train()):
//
//     indices 0..N ─permute─► chunker ─► batcher ─► Batch
//
//   streaming mode (model returns data from load_data()):
//
//     stream (repeat → shuffle buffer → batch) ─► Batch
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Splits index lists into mini-batches and applies handlers
pub mod chunker;

/// Row-aligned input/target tensors
pub mod dataset;

/// Gathers rows by index into a Batch
pub mod batcher;

/// Endless, optionally shuffled mini-batch streams
pub mod stream;

/// Shuffles and splits rows into train/validation sets
pub mod splitter;

/// Synthetic 3-D surface data for the VAE demo
pub mod synthetic;
