// ============================================================
// Layer 3 — Named Callables
// ============================================================
// Some settings are functions: the hidden-layer activation,
// the reconstruction loss, the optimizer. JSON has no function
// type, so a function-valued setting is written as a marker
// tuple:
//
//   ["MODELLIB_CONFIG__CALLABLE_TYPE", "relu", "activation"]
//     │                                 │        │
//     marker                            name     module
//
// On load, (module, name) is looked up in a static registry.
// Every function the crate can restore is a variant of one of
// the enums below, so nothing is imported dynamically.
//
// Reference: serde documentation (Implementing Serialize)
//            Rust Book §6 (Enums)

use std::fmt;
use std::ops::Deref;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// First element of every encoded callable.
pub const CALLABLE_MARKER: &str = "MODELLIB_CONFIG__CALLABLE_TYPE";

/// A function that can be referenced by name from a config file.
pub trait NamedCallable: Sized + Copy {
    /// Registry module this family of functions lives in.
    const MODULE: &'static str;

    /// Stable name written to disk.
    fn name(&self) -> &'static str;

    /// Inverse of [`NamedCallable::name`].
    fn resolve(name: &str) -> Option<Self>;
}

/// Modules the registry can restore callables from.
pub fn registered_modules() -> [&'static str; 3] {
    [Activation::MODULE, ReconstructionLoss::MODULE, OptimizerKind::MODULE]
}

// ─── Callable<T> ──────────────────────────────────────────────────────────────
/// Wrapper that gives any [`NamedCallable`] the marker-tuple encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callable<T>(pub T);

impl<T> Deref for Callable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Callable<T> {
    fn from(value: T) -> Self {
        Callable(value)
    }
}

impl<T: NamedCallable> Serialize for Callable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(CALLABLE_MARKER)?;
        tup.serialize_element(self.0.name())?;
        tup.serialize_element(T::MODULE)?;
        tup.end()
    }
}

impl<'de, T: NamedCallable> Deserialize<'de> for Callable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MarkerVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: NamedCallable> Visitor<'de> for MarkerVisitor<T> {
            type Value = Callable<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a [marker, name, module] callable tuple")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let marker: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if marker != CALLABLE_MARKER {
                    return Err(de::Error::custom(format!(
                        "expected callable marker, found '{marker}'"
                    )));
                }
                let name: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let module: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;

                if module != T::MODULE {
                    return Err(de::Error::custom(format!(
                        "callable '{name}' belongs to module '{module}', expected '{}'",
                        T::MODULE
                    )));
                }
                T::resolve(&name).map(Callable).ok_or_else(|| {
                    de::Error::custom(format!("unknown callable '{name}' in module '{module}'"))
                })
            }
        }

        deserializer.deserialize_tuple(3, MarkerVisitor(std::marker::PhantomData))
    }
}

// ─── Activation ───────────────────────────────────────────────────────────────
/// Element-wise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Gelu,
    Silu,
}

impl NamedCallable for Activation {
    const MODULE: &'static str = "activation";

    fn name(&self) -> &'static str {
        match self {
            Activation::Relu    => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh    => "tanh",
            Activation::Gelu    => "gelu",
            Activation::Silu    => "silu",
        }
    }

    fn resolve(name: &str) -> Option<Self> {
        match name {
            "relu"    => Some(Activation::Relu),
            "sigmoid" => Some(Activation::Sigmoid),
            "tanh"    => Some(Activation::Tanh),
            "gelu"    => Some(Activation::Gelu),
            "silu"    => Some(Activation::Silu),
            _ => None,
        }
    }
}

// ─── ReconstructionLoss ───────────────────────────────────────────────────────
/// Per-sample reconstruction loss. Returns one value per row,
/// the batch mean is taken after the KL term is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionLoss {
    SumOfSquaredDifferences,
    MeanOfSquaredDifferences,
}

impl NamedCallable for ReconstructionLoss {
    const MODULE: &'static str = "loss";

    fn name(&self) -> &'static str {
        match self {
            ReconstructionLoss::SumOfSquaredDifferences  => "sum_of_squared_differences",
            ReconstructionLoss::MeanOfSquaredDifferences => "mean_of_squared_differences",
        }
    }

    fn resolve(name: &str) -> Option<Self> {
        match name {
            "sum_of_squared_differences"  => Some(ReconstructionLoss::SumOfSquaredDifferences),
            "mean_of_squared_differences" => Some(ReconstructionLoss::MeanOfSquaredDifferences),
            _ => None,
        }
    }
}

// ─── OptimizerKind ────────────────────────────────────────────────────────────
/// Gradient-descent rule used by a model's update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    AdamW,
    Sgd,
}

impl NamedCallable for OptimizerKind {
    const MODULE: &'static str = "optim";

    fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Adam  => "adam",
            OptimizerKind::AdamW => "adamw",
            OptimizerKind::Sgd   => "sgd",
        }
    }

    fn resolve(name: &str) -> Option<Self> {
        match name {
            "adam"  => Some(OptimizerKind::Adam),
            "adamw" => Some(OptimizerKind::AdamW),
            "sgd"   => Some(OptimizerKind::Sgd),
            _ => None,
        }
    }
}
