// ============================================================
// Layer 5 — Dense Layer Stacks
// ============================================================
// The VAE encoder and decoder are both plain stacks of dense
// layers:
//
//   x ─► Linear ─► [BatchNorm] ─► activation ─► ... ─► out
//
// BatchNorm is optional (use_bn). burn decides its mode from
// the backend: on an autodiff backend it normalises with batch
// statistics and updates the running averages; on the inner
// backend (after .valid()) it uses the running averages.
//
// burn's BatchNorm wants [batch, channels, ...], so a [batch,
// features] activation is viewed as [batch, features, 1]
// around the call.
//
// Reference: Burn Book §3 (Building Blocks)
//            Ioffe & Szegedy (2015) Batch Normalization

use burn::{
    nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::callable::Activation;
use crate::ml::activation;

#[derive(Config, Debug)]
pub struct MlpConfig {
    pub in_size: usize,
    /// Units of every layer, in order
    pub layers:  Vec<usize>,
    #[config(default = false)]
    pub use_bn:  bool,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut width  = self.in_size;
        let mut layers = Vec::with_capacity(self.layers.len());
        for &units in &self.layers {
            layers.push(DenseLayer {
                linear: LinearConfig::new(width, units).init(device),
                norm:   self.use_bn.then(|| BatchNormConfig::new(units).init(device)),
            });
            width = units;
        }
        Mlp { layers }
    }

    /// Width of the stack's output
    pub fn out_size(&self) -> usize {
        self.layers.last().copied().unwrap_or(self.in_size)
    }
}

#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    pub linear: Linear<B>,
    pub norm:   Option<BatchNorm<B>>,
}

impl<B: Backend> DenseLayer<B> {
    pub fn forward(&self, x: Tensor<B, 2>, act: Activation) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = match &self.norm {
            Some(norm) => {
                let [batch, features] = x.dims();
                norm.forward(x.reshape([batch, features, 1])).reshape([batch, features])
            }
            None => x,
        };
        activation::apply(act, x)
    }
}

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    pub layers: Vec<DenseLayer<B>>,
}

impl<B: Backend> Mlp<B> {
    /// Shape: [batch, in] → [batch, layers.last()]
    pub fn forward(&self, x: Tensor<B, 2>, act: Activation) -> Tensor<B, 2> {
        self.layers.iter().fold(x, |x, layer| layer.forward(x, act))
    }
}
