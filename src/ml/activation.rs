use burn::{prelude::*, tensor::activation};

use crate::domain::callable::Activation;

/// Apply a configured activation element-wise.
pub fn apply<B: Backend, const D: usize>(act: Activation, x: Tensor<B, D>) -> Tensor<B, D> {
    match act {
        Activation::Relu    => activation::relu(x),
        Activation::Sigmoid => activation::sigmoid(x),
        Activation::Tanh    => activation::tanh(x),
        Activation::Gelu    => activation::gelu(x),
        Activation::Silu    => activation::silu(x),
    }
}

/// Like [`apply`], with None meaning linear (identity).
pub fn apply_optional<B: Backend, const D: usize>(
    act: Option<Activation>,
    x:   Tensor<B, D>,
) -> Tensor<B, D> {
    match act {
        Some(act) => apply(act, x),
        None      => x,
    }
}
