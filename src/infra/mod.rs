// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the cross-cutting concerns every model instance
// owns but that do not belong in the training loop itself:
//
//   checkpoint.rs — Numbered run directories, parameter
//                   snapshots (burn NamedMpkFileRecorder),
//                   the config.json written on first save and
//                   the latest-snapshot pointer.
//
//   summaries.rs  — Scalar metric registry and the per-run
//                   summaries.csv it is written to.
//
//   logger.rs     — Per-model logger: scope, level threshold
//                   and an optional log-file mirror on top of
//                   tracing.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Run directories and model snapshots
pub mod checkpoint;

/// Summary registry and CSV writer
pub mod summaries;

/// Per-model scoped logger
pub mod logger;
