// ============================================================
// Layer 5 — Inferencer
// ============================================================
// infer() runs the model's run_output hook over the rows of an
// input tensor, optionally in mini-batches:
//
//   batch_size None     → one call over all rows
//   batch_size Some(k)  → one call per full chunk of k rows,
//                         outputs concatenated along dim 0
//
// Like training, a trailing partial chunk is dropped: with
// N rows the result has ⌊N/k⌋·k rows. Pass None (or a k that
// divides N) to get one output row per input row.
//
// Outputs live on the inner backend: inference never records
// an autodiff graph.

use anyhow::Result;
use burn::{prelude::*, tensor::backend::AutodiffBackend};

use crate::data::{
    batcher::gather_rows,
    chunker::{try_maybe_chunked_with, Chunked},
};
use crate::ml::hooks::TrainableModel;
use crate::ml::model::{Model, ModelError};

impl<B: AutodiffBackend, M: TrainableModel<B>> Model<B, M> {
    /// Model output for `inputs` ([N, in] → [rows, out]).
    pub fn infer(
        &self,
        inputs:     &Tensor<B, 2>,
        batch_size: Option<usize>,
        args:       &M::Args,
    ) -> Result<Tensor<B::InnerBackend, 2>> {
        if batch_size == Some(0) {
            return Err(ModelError::ZeroBatchSize.into());
        }

        let rows = inputs.dims()[0];
        if rows == 0 {
            return Err(ModelError::EmptyInference { inputs: rows }.into());
        }

        let indices: Vec<usize> = (0..rows).collect();
        let result = try_maybe_chunked_with(
            &indices,
            batch_size,
            &mut (),
            |_, chunk| self.infer_step(chunk, inputs, args),
            |_, all| self.infer_step(all, inputs, args),
        )?;

        match result {
            Chunked::Whole(output) => Ok(output),
            Chunked::Parts(mut parts) => match parts.len() {
                0 => Err(ModelError::EmptyInference { inputs: rows }.into()),
                1 => Ok(parts.remove(0)),
                _ => Ok(Tensor::cat(parts, 0)),
            },
        }
    }

    /// run_output on the rows `indices` of `inputs`.
    pub fn infer_step(
        &self,
        indices: &[usize],
        inputs:  &Tensor<B, 2>,
        args:    &M::Args,
    ) -> Result<Tensor<B::InnerBackend, 2>> {
        self.inner.run_output(gather_rows(inputs, indices), args)
    }
}
