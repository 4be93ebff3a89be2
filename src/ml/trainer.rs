// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One call of train() is one epoch. Two ways to get data:
//
//   array mode     — the caller passes TrainingData. Training
//                    rows are visited in a fresh random order;
//                    with a validation split, every training row
//                    is paired with a validation row drawn at
//                    random (with replacement), so both halves
//                    of a step see the same number of rows.
//                    The pairs go through the chunker with
//                    train_step as both handlers:
//
//                      [(t0,v0) (t1,v1) ... (tN-1,vN-1)]
//                        └── batch_size ──┘  └── ... ──┘
//
//   streaming mode — the model returned data from load_data.
//                    The epoch runs ⌊rows / batch_size⌋ steps,
//                    each pulling its batch from the stream.
//                    Arrays passed to train() are ignored.
//
// After the steps:
//   1. on_epoch_done hook
//   2. save()                  every saver_interval epochs
//   3. epoch summaries         every epoch_summaries_interval
//   4. info log line           "<epoch>  train loss  validate"
//   5. epoch counter += 1
//
// Validation loss is NaN when there is no validation data.
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::{anyhow, ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use rand::{seq::SliceRandom, Rng};

use crate::data::{
    batcher::gather,
    chunker::{try_maybe_chunked_with, Chunked},
    dataset::TrainingData,
};
use crate::domain::traits::Settings;
use crate::ml::hooks::TrainableModel;
use crate::ml::model::{Model, ModelError};

/// Rows used by one sample of a training step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPair {
    pub train: usize,
    pub valid: Option<usize>,
}

/// Where a training step takes its mini-batch from.
pub enum StepSource<'a, B: AutodiffBackend> {
    /// Rows of caller-supplied data
    Arrays {
        indices: &'a [IndexPair],
        data:    &'a TrainingData<B>,
    },
    /// Next batch of the model's own data stream
    Stream,
}

/// True when an optional interval fires at `count`.
/// An interval of 0 never fires.
fn interval_hit(interval: Option<u64>, count: u64) -> bool {
    matches!(interval, Some(n) if n > 0 && count % n == 0)
}

/// Element-wise mean of (train, valid) loss pairs.
fn mean_pair(pairs: &[(f64, f64)]) -> (f64, f64) {
    let n = pairs.len() as f64;
    let train = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let valid = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    (train, valid)
}

impl<B: AutodiffBackend, M: TrainableModel<B>> Model<B, M> {
    /// Run one epoch and return its (training, validation) loss.
    ///
    /// `data` is required unless the model streams its own data.
    /// With `batch_size` None every row is used in a single step;
    /// otherwise rows that do not fill a last full mini-batch
    /// are skipped for this epoch.
    pub fn train(
        &mut self,
        data:       Option<&TrainingData<B>>,
        batch_size: Option<usize>,
        args:       &M::Args,
    ) -> Result<(f64, f64)> {
        let (train_loss, valid_loss) = if self.streams.is_some() {
            self.train_streaming(args)?
        } else {
            let data = data.ok_or(ModelError::MissingTrainingData)?;
            self.train_arrays(data, batch_size, args)?
        };

        self.inner.on_epoch_done(self.global_step);

        let epoch = self.global_step;
        let base  = self.config.model();
        let (saver_interval, summaries_interval) = (base.saver_interval, base.epoch_summaries_interval);

        if interval_hit(saver_interval, epoch) {
            self.save()?;
        }

        if interval_hit(summaries_interval, epoch) {
            self.update_summary("epoch_train_loss", train_loss);
            self.update_summary("epoch_valid_loss", valid_loss);
            self.write_summary("epoch");
        }

        self.logger.info(&format!(
            "{epoch:9}\ttrain loss: {train_loss:.5}\tvalidate: {valid_loss:.5}"
        ));

        self.increment_global_step();
        Ok((train_loss, valid_loss))
    }

    fn train_arrays(
        &mut self,
        data:       &TrainingData<B>,
        batch_size: Option<usize>,
        args:       &M::Args,
    ) -> Result<(f64, f64)> {
        if batch_size == Some(0) {
            return Err(ModelError::ZeroBatchSize.into());
        }

        let samples = data.train.len();
        if samples == 0 {
            return Err(ModelError::EmptyEpoch { samples }.into());
        }

        let mut order: Vec<usize> = (0..samples).collect();
        order.shuffle(&mut self.rng);

        let pairs: Vec<IndexPair> = match &data.validation {
            Some(valid) => {
                ensure!(!valid.is_empty(), "validation split is empty");
                order
                    .into_iter()
                    .map(|train| IndexPair { train, valid: Some(self.rng.gen_range(0..valid.len())) })
                    .collect()
            }
            None => order.into_iter().map(|train| IndexPair { train, valid: None }).collect(),
        };

        let result = try_maybe_chunked_with(
            &pairs,
            batch_size,
            self,
            |model, chunk| model.train_step(StepSource::Arrays { indices: chunk, data }, args),
            |model, all| model.train_step(StepSource::Arrays { indices: all, data }, args),
        )?;

        match result {
            Chunked::Whole(losses) => Ok(losses),
            Chunked::Parts(parts) if parts.is_empty() => Err(ModelError::EmptyEpoch { samples }.into()),
            Chunked::Parts(parts) => Ok(mean_pair(&parts)),
        }
    }

    fn train_streaming(&mut self, args: &M::Args) -> Result<(f64, f64)> {
        let (num_batches, samples) = match &self.streams {
            Some(streams) => (streams.batches_per_epoch(), streams.train.len()),
            None          => return Err(anyhow!("model has no data stream")),
        };
        if num_batches == 0 {
            return Err(ModelError::EmptyEpoch { samples }.into());
        }

        let mut losses = Vec::with_capacity(num_batches);
        for _ in 0..num_batches {
            losses.push(self.train_step(StepSource::Stream, args)?);
        }
        Ok(mean_pair(&losses))
    }

    /// One gradient step plus (optional) validation loss.
    pub fn train_step(&mut self, source: StepSource<'_, B>, args: &M::Args) -> Result<(f64, f64)> {
        let (train_loss, valid_loss) = match source {
            StepSource::Arrays { indices, data } => {
                let train_rows: Vec<usize> = indices.iter().map(|p| p.train).collect();
                let train_loss = self.inner.run_update_and_loss(gather(&data.train, &train_rows), args)?;

                let valid_loss = match &data.validation {
                    Some(valid) => {
                        let valid_rows: Vec<usize> = indices.iter().filter_map(|p| p.valid).collect();
                        self.inner.run_loss(gather(valid, &valid_rows), args)?
                    }
                    None => f64::NAN,
                };
                (train_loss, valid_loss)
            }
            StepSource::Stream => {
                let streams = self
                    .streams
                    .as_mut()
                    .ok_or_else(|| anyhow!("model has no data stream"))?;
                let train_batch = streams.train.next_batch();
                let valid_batch = streams.validation.as_mut().map(|s| s.next_batch());

                let train_loss = self.inner.run_update_and_loss(train_batch, args)?;
                let valid_loss = match valid_batch {
                    Some(batch) => self.inner.run_loss(batch, args)?,
                    None        => f64::NAN,
                };
                (train_loss, valid_loss)
            }
        };

        self.inner.on_train_step_done(self.batch_step);

        let step = self.batch_step;
        if self.summaries.is_some() && interval_hit(self.config.model().step_summaries_interval, step) {
            self.update_summary("step_train_loss", train_loss);
            self.update_summary("step_valid_loss", valid_loss);
            self.write_summary("step");
        }

        self.increment_batch_step();
        Ok((train_loss, valid_loss))
    }
}
