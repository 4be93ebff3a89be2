// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that describe a model run, independent of
// the deep-learning framework:
//
//   config.rs   — ModelConfig (shared harness settings),
//                 LogLevel and ConfigError
//   callable.rs — function-valued settings (activations,
//                 losses, optimizers) and their marker-tuple
//                 JSON encoding
//   traits.rs   — Settings: JSON save/load for any config
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Shared harness settings and config errors
pub mod config;

/// Named references to functions stored in configs
pub mod callable;

/// Persistence trait implemented by every config
pub mod traits;
