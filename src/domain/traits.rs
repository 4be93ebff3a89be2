// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Settings is implemented by every config a model can be
// built from. It gives them a common JSON persistence story:
//
//   save / load         — print the error and carry on
//                         (a failed write never stops training)
//   try_save / try_load — return ConfigError so callers that
//                         must know about failure can react
//
// load() updates in place: keys present in the file overwrite
// the current values, keys it lacks keep them.
//
// The harness only needs model() to reach the shared fields;
// everything else on a concrete config is for its model.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::{fmt, fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::config::{check_callables, ConfigError, ModelConfig};

// ─── Settings ─────────────────────────────────────────────────────────────────
/// A serialisable configuration that carries the shared
/// [`ModelConfig`] fields.
pub trait Settings: Serialize + DeserializeOwned + Clone + fmt::Debug {
    /// The shared harness settings
    fn model(&self) -> &ModelConfig;

    /// Write this config as JSON.
    fn try_save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config written by [`Settings::try_save`].
    fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let doc  = read_document(path)?;
        serde_json::from_value(doc).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrite the fields named in the file at `path`.
    /// `self` is unchanged unless the merged config is valid.
    fn try_update(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json_err = |source: serde_json::Error| ConfigError::Json { path: path.to_path_buf(), source };

        let stored = read_document(path)?;
        let mut current = serde_json::to_value(&*self).map_err(json_err)?;
        if let (Some(fields), Some(updates)) = (current.as_object_mut(), stored.as_object()) {
            for (key, value) in updates {
                fields.insert(key.clone(), value.clone());
            }
        }

        *self = serde_json::from_value(current).map_err(json_err)?;
        Ok(())
    }

    /// Like [`Settings::try_save`], but failures are printed to
    /// stderr and swallowed.
    fn save(&self, path: impl AsRef<Path>) {
        if let Err(e) = self.try_save(path) {
            eprintln!("{e}");
        }
    }

    /// Update `self` from the config stored at `path`.
    /// On failure the error is printed and `self` is left as is.
    fn load(&mut self, path: impl AsRef<Path>) {
        if let Err(e) = self.try_update(path) {
            eprintln!("{e}");
        }
    }
}

/// Parse a config file and check its callables.
fn read_document(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: serde_json::Value = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    check_callables(&doc)?;
    Ok(doc)
}

impl Settings for ModelConfig {
    fn model(&self) -> &ModelConfig {
        self
    }
}
