use anyhow::{ensure, Result};
use burn::prelude::*;

/// Inputs and targets of one data split, row-aligned.
/// Shapes: inputs [N, in], targets [N, out].
#[derive(Debug, Clone)]
pub struct Split<B: Backend> {
    pub inputs:  Tensor<B, 2>,
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> Split<B> {
    pub fn new(inputs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Result<Self> {
        let n_in  = inputs.dims()[0];
        let n_out = targets.dims()[0];
        ensure!(
            n_in == n_out,
            "inputs have {n_in} rows but targets have {n_out}"
        );
        Ok(Self { inputs, targets })
    }

    /// Autoencoder split: the targets are the inputs.
    pub fn autoencoding(inputs: Tensor<B, 2>) -> Self {
        Self { targets: inputs.clone(), inputs }
    }

    pub fn len(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Training split plus an optional validation split.
#[derive(Debug, Clone)]
pub struct TrainingData<B: Backend> {
    pub train:      Split<B>,
    pub validation: Option<Split<B>>,
}

impl<B: Backend> TrainingData<B> {
    pub fn new(train: Split<B>, validation: Option<Split<B>>) -> Self {
        Self { train, validation }
    }
}
