// ============================================================
// Layer 4 — Row Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a list of sample
// indices into a mini-batch by selecting those rows from a
// split's input and target tensors.
//
// Items are row indices rather than row values: the split
// already lives on the device as two tensors, so a batch is a
// single select per tensor instead of a host-side stack.
//
// How gathering works here:
//   Input:  Split with tensors [N, in] and [N, out],
//           indices [i0, i1, ..., ik-1]
//   Output: Batch with tensors [k, in] and [k, out]
//
//   The indices become a 1-D Int tensor and Tensor::select
//   picks those rows along dimension 0. Indices may repeat, since
//   validation batches are drawn with replacement.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::Split;

// ─── Batch ────────────────────────────────────────────────────────────────────
/// One mini-batch, ready for a model hook.
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    /// Shape: [batch_size, in]
    pub inputs:  Tensor<B, 2>,
    /// Shape: [batch_size, out]
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> Batch<B> {
    pub fn len(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a 1-D Int tensor of row indices.
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}

// ─── RowBatcher ───────────────────────────────────────────────────────────────
/// Gathers rows of one split into batches.
#[derive(Debug, Clone)]
pub struct RowBatcher<B: Backend> {
    split: Split<B>,
}

impl<B: Backend> RowBatcher<B> {
    pub fn new(split: Split<B>) -> Self {
        Self { split }
    }

    pub fn split(&self) -> &Split<B> {
        &self.split
    }
}

impl<B: Backend> Batcher<B, usize, Batch<B>> for RowBatcher<B> {
    /// Rows `items` of the split, moved to `device`.
    fn batch(&self, items: Vec<usize>, device: &B::Device) -> Batch<B> {
        let rows = index_tensor::<B>(&items, &self.split.inputs.device());
        Batch {
            inputs:  self.split.inputs.clone().select(0, rows.clone()).to_device(device),
            targets: self.split.targets.clone().select(0, rows).to_device(device),
        }
    }
}

/// Select rows `indices` from a split, on the split's device.
pub fn gather<B: Backend>(split: &Split<B>, indices: &[usize]) -> Batch<B> {
    let device = split.inputs.device();
    RowBatcher::new(split.clone()).batch(indices.to_vec(), &device)
}

/// Select rows `indices` from a bare input tensor (inference).
pub fn gather_rows<B: Backend>(inputs: &Tensor<B, 2>, indices: &[usize]) -> Tensor<B, 2> {
    let rows = index_tensor::<B>(indices, &inputs.device());
    inputs.clone().select(0, rows)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    fn split(device: &<TestBackend as Backend>::Device) -> Split<TestBackend> {
        // Row i holds [i, 10 + i]
        let rows: Vec<f32> = (0..5).flat_map(|i| [i as f32, 10.0 + i as f32]).collect();
        let inputs = Tensor::<TestBackend, 2>::from_data(TensorData::new(rows, [5, 2]), device);
        Split::autoencoding(inputs)
    }

    #[test]
    fn test_gather_selects_rows_in_order() {
        let device = Default::default();
        let batch  = gather(&split(&device), &[3, 0, 3]);
        assert_eq!(batch.len(), 3);

        let values = batch.inputs.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![3.0, 13.0, 0.0, 10.0, 3.0, 13.0]);
    }

    #[test]
    fn test_batcher_gathers_targets_with_inputs() {
        let device  = Default::default();
        let rows: Vec<f32> = (0..4).map(|i| i as f32).collect();
        let inputs  = Tensor::<TestBackend, 2>::from_data(TensorData::new(rows, [4, 1]), &device);
        let targets = inputs.clone().mul_scalar(-1.0);
        let batcher = RowBatcher::new(Split::new(inputs, targets).unwrap());

        let batch = batcher.batch(vec![2, 1], &device);
        assert_eq!(batch.inputs.into_data().to_vec::<f32>().unwrap(), vec![2.0, 1.0]);
        assert_eq!(batch.targets.into_data().to_vec::<f32>().unwrap(), vec![-2.0, -1.0]);
    }

    #[test]
    fn test_gather_rows_shape() {
        let device = Default::default();
        let rows   = gather_rows(&split(&device).inputs, &[1, 2]);
        assert_eq!(rows.dims(), [2, 2]);
    }
}
