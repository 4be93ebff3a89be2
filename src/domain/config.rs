// ============================================================
// Layer 3 — Model Configuration
// ============================================================
// The settings every model shares: where summaries and
// checkpoints go, how often they are written, the logger's
// scope and level, and how a streaming dataset is batched.
//
// Model-specific configs embed ModelConfig with
// #[serde(flatten)], so the JSON on disk stays one flat
// object, with the same shape whether it was written by the base
// harness or by a concrete model.
//
// Missing keys fall back to the defaults below
// (#[serde(default)]), which lets an older config.json load
// after a field has been added.
//
// Reference: serde documentation (Field attributes)
//            Rust Book §9 (Error Handling)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::callable::{registered_modules, CALLABLE_MARKER};

// ─── LogLevel ─────────────────────────────────────────────────────────────────
/// Severity threshold for a model's logger.
/// Ordered from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// ─── ModelConfig ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Root for per-run summary directories; None disables summaries
    pub summaries_root:           Option<PathBuf>,
    /// Root for per-run checkpoint directories; None disables saving
    pub checkpoints_root:         Option<PathBuf>,
    /// Write epoch summaries every N epochs
    pub epoch_summaries_interval: Option<u64>,
    /// Write step summaries every N mini-batches
    pub step_summaries_interval:  Option<u64>,
    /// Save a checkpoint every N epochs
    pub saver_interval:           Option<u64>,
    /// Snapshots kept on disk per run (oldest are deleted)
    pub saver_max_to_keep:        usize,
    /// Logger name and prefix of the standard summary tags
    pub scope_name:               String,
    pub log_level:                LogLevel,
    /// Mirror log lines into this file (truncated on open)
    pub log_file:                 Option<PathBuf>,
    /// Mini-batch size of the streaming dataset
    pub batch_size:               usize,
    /// Accepted for config compatibility; batches are produced synchronously
    pub prefetch:                 Option<usize>,
    /// Shuffle-buffer size of the streaming dataset
    pub shuffle_buffer:           Option<usize>,
    /// Seed for index permutations and shuffle buffers
    pub seed:                     Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            summaries_root:           None,
            checkpoints_root:         None,
            epoch_summaries_interval: Some(1),
            step_summaries_interval:  None,
            saver_interval:           None,
            saver_max_to_keep:        50,
            scope_name:               "model".to_string(),
            log_level:                LogLevel::Debug,
            log_file:                 None,
            batch_size:               32,
            prefetch:                 None,
            shuffle_buffer:           None,
            seed:                     None,
        }
    }
}

impl ModelConfig {
    /// Config used for the logger of a model that failed to
    /// initialise: no scope, errors only.
    pub fn error_only() -> Self {
        Self {
            scope_name: String::new(),
            log_level:  LogLevel::Error,
            ..Self::default()
        }
    }
}

// ─── ConfigError ──────────────────────────────────────────────────────────────
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON in '{path}': {source}")]
    Json {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("restoring callable '{name}' from module '{module}' is not implemented")]
    NotImplemented { name: String, module: String },
}

/// Walk the top-level entries of a config document and make
/// sure every marker tuple names a module the registry can
/// restore from. Runs before typed deserialisation so that an
/// unsupported callable reports NotImplemented rather than a
/// generic JSON error.
pub fn check_callables(doc: &serde_json::Value) -> Result<(), ConfigError> {
    let Some(entries) = doc.as_object() else {
        return Ok(());
    };

    for value in entries.values() {
        let Some(items) = value.as_array() else { continue };
        if items.first().and_then(|m| m.as_str()) != Some(CALLABLE_MARKER) {
            continue;
        }

        let name   = items.get(1).and_then(|v| v.as_str()).unwrap_or_default();
        let module = items.get(2).and_then(|v| v.as_str()).unwrap_or_default();

        if items.len() != 3 || !registered_modules().contains(&module) {
            return Err(ConfigError::NotImplemented {
                name:   name.to_string(),
                module: module.to_string(),
            });
        }
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ModelConfig::default();
        assert_eq!(c.epoch_summaries_interval, Some(1));
        assert_eq!(c.step_summaries_interval, None);
        assert_eq!(c.saver_max_to_keep, 50);
        assert_eq!(c.batch_size, 32);
        assert_eq!(c.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let c: ModelConfig = serde_json::from_str(r#"{"batch_size": 7}"#).unwrap();
        assert_eq!(c.batch_size, 7);
        assert_eq!(c.scope_name, "model");
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_unknown_callable_module_is_not_implemented() {
        let doc = serde_json::json!({
            "scope_name": "x",
            "hidden_activation": [CALLABLE_MARKER, "my_fn", "some.python.module"],
        });
        let err = check_callables(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::NotImplemented { .. }));
        assert!(err.to_string().contains("not implemented"));
    }

    #[test]
    fn test_known_callable_module_passes() {
        let doc = serde_json::json!({
            "hidden_activation": [CALLABLE_MARKER, "relu", "activation"],
            "n_hidden": [10, 10],
        });
        assert!(check_callables(&doc).is_ok());
    }
}
