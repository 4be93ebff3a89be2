// ============================================================
// Layer 5 — Variational Autoencoder
// ============================================================
// Network (n_hidden = [h1, h2], latent_size = L, in_size = D):
//
//   x [B, D]
//     │ encoder: Dense(h1) ─► Dense(h2)      hidden activation
//     ├──────────────┬──────────────────┐
//     ▼              ▼                  │
//   μ = Linear(L)  σ_raw = Linear(L)    │  (both linear)
//     │              │
//     │    σ² = σ_raw²
//     │    log σ² = ln(σ² + ε)          ε = 1e-45
//     │    σ = |σ_raw|
//     ▼              ▼
//   z = μ + σ ⊙ n,   n ~ N(0, 1), one [1, L] draw per pass,
//                    broadcast over the batch   [B, L]
//     │ decoder: Dense(h2) ─► Dense(h1)      hidden activation
//     ▼
//   x̂ = Linear(D) + output activation (linear by default)
//
// The σ head outputs σ itself rather than log σ². Recovering σ²
// from a log-variance needs exp(), which overflows f32 above
// ~88.7; squaring σ does not. ε keeps log σ² finite when σ is
// exactly 0. The head is linear and may go negative, so the
// noise is scaled by |σ|.
//
// Loss = mean over the batch of reconstruction + β·KL (loss.rs).
// Learning rate and β are passed per call (VaeArgs), so either
// can be annealed during training.
//
// Training steps run the autodiff network; validation,
// inference and latent statistics run net.valid() on the inner
// backend, which also switches BatchNorm to its running
// statistics.
//
// Reference: Kingma & Welling (2014) Auto-Encoding Variational Bayes
//            Burn Book §5 (Custom Training Loop)

use anyhow::{ensure, Result};
use burn::{
    module::AutodiffModule,
    nn::{Linear, LinearConfig},
    optim::{AdamConfig, AdamWConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::Batch;
use crate::domain::{
    callable::{Activation, Callable, OptimizerKind, ReconstructionLoss},
    config::ModelConfig,
    traits::Settings,
};
use crate::ml::{
    activation,
    hooks::TrainableModel,
    loss,
    mlp::{Mlp, MlpConfig},
    model::Model,
};

/// Added to σ² before the logarithm. In f32 this rounds to the
/// smallest subnormal, so ln(ε) ≈ −103.3.
pub const LOG_EPSILON: f64 = 1e-45;

/// The harness running a VAE
pub type VaeModel<B> = Model<B, Vae<B>>;

// ─── VaeConfig ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaeConfig {
    #[serde(flatten)]
    pub model:               ModelConfig,
    pub in_size:             usize,
    pub latent_size:         usize,
    /// Encoder layer widths; the decoder uses them reversed
    pub n_hidden:            Vec<usize>,
    pub hidden_activation:   Callable<Activation>,
    /// None means a linear reconstruction layer
    pub output_activation:   Option<Callable<Activation>>,
    pub optimizer:           Callable<OptimizerKind>,
    pub use_bn:              bool,
    pub reconstruction_loss: Callable<ReconstructionLoss>,
}

impl Default for VaeConfig {
    fn default() -> Self {
        Self {
            model:               ModelConfig { scope_name: "vae".to_string(), ..ModelConfig::default() },
            in_size:             3,
            latent_size:         2,
            n_hidden:            vec![10, 10],
            hidden_activation:   Callable(Activation::Relu),
            output_activation:   None,
            optimizer:           Callable(OptimizerKind::Adam),
            use_bn:              false,
            reconstruction_loss: Callable(ReconstructionLoss::SumOfSquaredDifferences),
        }
    }
}

impl Settings for VaeConfig {
    fn model(&self) -> &ModelConfig {
        &self.model
    }
}

impl VaeConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.in_size > 0, "in_size must be positive");
        ensure!(self.latent_size > 0, "latent_size must be positive");
        ensure!(!self.n_hidden.is_empty(), "n_hidden needs at least one layer");
        ensure!(
            self.n_hidden.iter().all(|&h| h > 0),
            "every n_hidden entry must be positive, got {:?}",
            self.n_hidden
        );
        Ok(())
    }

    pub fn init_net<B: Backend>(&self, device: &B::Device) -> VaeNet<B> {
        let encoder_cfg = MlpConfig::new(self.in_size, self.n_hidden.clone()).with_use_bn(self.use_bn);
        let decoder_cfg = MlpConfig::new(self.latent_size, self.n_hidden.iter().rev().copied().collect())
            .with_use_bn(self.use_bn);

        let code_width = encoder_cfg.out_size();
        let out_width  = decoder_cfg.out_size();

        VaeNet {
            encoder:        encoder_cfg.init(device),
            latent_mean:    LinearConfig::new(code_width, self.latent_size).init(device),
            latent_sigma:   LinearConfig::new(code_width, self.latent_size).init(device),
            decoder:        decoder_cfg.init(device),
            reconstruction: LinearConfig::new(out_width, self.in_size).init(device),
        }
    }
}

// ─── VaeNet ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct VaeNet<B: Backend> {
    pub encoder:        Mlp<B>,
    pub latent_mean:    Linear<B>,
    pub latent_sigma:   Linear<B>,
    pub decoder:        Mlp<B>,
    pub reconstruction: Linear<B>,
}

/// Every intermediate of one forward pass.
pub struct VaeOutput<B: Backend> {
    /// Shape: [batch, in_size]
    pub reconstruction: Tensor<B, 2>,
    /// Sampled code, shape: [batch, latent_size]
    pub latent:         Tensor<B, 2>,
    pub mean:           Tensor<B, 2>,
    /// |σ_raw|
    pub sigma:          Tensor<B, 2>,
    pub sigma_sq:       Tensor<B, 2>,
    pub log_sigma_sq:   Tensor<B, 2>,
}

/// (σ, σ², ln(σ² + ε)) from the raw σ head output.
pub fn sigma_terms<B: Backend>(sigma_raw: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
    let sigma_sq     = sigma_raw.clone() * sigma_raw.clone();
    let log_sigma_sq = (sigma_sq.clone() + LOG_EPSILON).log();
    (sigma_raw.abs(), sigma_sq, log_sigma_sq)
}

impl<B: Backend> VaeNet<B> {
    /// Encoder only. Returns (μ, raw σ head output).
    pub fn encode(&self, x: Tensor<B, 2>, hidden: Activation) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let code = self.encoder.forward(x, hidden);
        (self.latent_mean.forward(code.clone()), self.latent_sigma.forward(code))
    }

    pub fn forward(
        &self,
        x:      Tensor<B, 2>,
        hidden: Activation,
        output: Option<Activation>,
    ) -> VaeOutput<B> {
        let (mean, sigma_raw) = self.encode(x, hidden);
        let (sigma, sigma_sq, log_sigma_sq) = sigma_terms(sigma_raw);

        // One noise vector per pass, shared by every row
        let [_, latent_size] = mean.dims();
        let noise  = Tensor::random([1, latent_size], Distribution::Normal(0.0, 1.0), &mean.device());
        let latent = mean.clone() + sigma.clone() * noise;

        let decoded        = self.decoder.forward(latent.clone(), hidden);
        let reconstruction = activation::apply_optional(output, self.reconstruction.forward(decoded));

        VaeOutput { reconstruction, latent, mean, sigma, sigma_sq, log_sigma_sq }
    }
}

// ─── Vae (model hooks) ────────────────────────────────────────────────────────
/// Per-call training arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaeArgs {
    pub learning_rate: f64,
    /// Weight of the KL term
    pub beta:          f64,
}

impl Default for VaeArgs {
    fn default() -> Self {
        Self { learning_rate: 1e-4, beta: 0.01 }
    }
}

type OptimizerStep<B> = Box<dyn FnMut(f64, VaeNet<B>, GradientsParams) -> VaeNet<B>>;

fn boxed_step<B, O>(mut optim: O) -> OptimizerStep<B>
where
    B: AutodiffBackend,
    O: Optimizer<VaeNet<B>, B> + 'static,
{
    Box::new(move |lr, net, grads| optim.step(lr, net, grads))
}

fn optimizer_for<B: AutodiffBackend>(kind: OptimizerKind) -> OptimizerStep<B> {
    match kind {
        OptimizerKind::Adam  => boxed_step(AdamConfig::new().init::<B, VaeNet<B>>()),
        OptimizerKind::AdamW => boxed_step(AdamWConfig::new().init::<B, VaeNet<B>>()),
        OptimizerKind::Sgd   => boxed_step(SgdConfig::new().init::<B, VaeNet<B>>()),
    }
}

pub struct Vae<B: AutodiffBackend> {
    net:                 VaeNet<B>,
    optim:               OptimizerStep<B>,
    hidden_activation:   Activation,
    output_activation:   Option<Activation>,
    reconstruction_loss: ReconstructionLoss,
}

impl<B: AutodiffBackend> Vae<B> {
    fn loss_on<BB: Backend>(&self, net: &VaeNet<BB>, batch: Batch<BB>, beta: f64) -> Tensor<BB, 1> {
        let out   = net.forward(batch.inputs, self.hidden_activation, self.output_activation);
        let recon = loss::reconstruction(self.reconstruction_loss, batch.targets, out.reconstruction);
        let kl    = loss::kl_divergence(out.mean, out.sigma_sq, out.log_sigma_sq, beta);
        loss::vae_loss(recon, kl)
    }

    /// Latent mean and σ for `inputs`, without sampling.
    pub fn latent_statistics(
        &self,
        inputs: Tensor<B::InnerBackend, 2>,
    ) -> (Tensor<B::InnerBackend, 2>, Tensor<B::InnerBackend, 2>) {
        let (mean, sigma_raw) = self.net.valid().encode(inputs, self.hidden_activation);
        (mean, sigma_raw.abs())
    }
}

impl<B: AutodiffBackend> TrainableModel<B> for Vae<B> {
    type Config = VaeConfig;
    type Args   = VaeArgs;
    type Net    = VaeNet<B>;

    fn build(config: &VaeConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            "VAE {} → {:?} → {} (bn: {})",
            config.in_size,
            config.n_hidden,
            config.latent_size,
            config.use_bn,
        );
        Ok(Self {
            net:                 config.init_net(device),
            optim:               optimizer_for(*config.optimizer),
            hidden_activation:   *config.hidden_activation,
            output_activation:   config.output_activation.map(|a| *a),
            reconstruction_loss: *config.reconstruction_loss,
        })
    }

    fn run_update_and_loss(&mut self, batch: Batch<B>, args: &VaeArgs) -> Result<f64> {
        let loss  = self.loss_on(&self.net, batch, args.beta);
        let value = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.net);
        self.net  = (self.optim)(args.learning_rate, self.net.clone(), grads);

        Ok(value)
    }

    fn run_loss(&self, batch: Batch<B>, args: &VaeArgs) -> Result<f64> {
        let net   = self.net.valid();
        let batch = Batch { inputs: batch.inputs.inner(), targets: batch.targets.inner() };
        Ok(self.loss_on(&net, batch, args.beta).into_scalar().elem::<f64>())
    }

    fn run_output(&self, inputs: Tensor<B, 2>, _args: &VaeArgs) -> Result<Tensor<B::InnerBackend, 2>> {
        let out = self.net.valid().forward(inputs.inner(), self.hidden_activation, self.output_activation);
        Ok(out.reconstruction)
    }

    fn net(&self) -> &VaeNet<B> {
        &self.net
    }

    fn set_net(&mut self, net: VaeNet<B>) {
        self.net = net;
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{Split, TrainingData};
    use crate::data::{stream::make_rng, synthetic};
    use crate::domain::config::LogLevel;
    use crate::ml::testing::{TestAutodiffBackend, TestBackend};
    use burn::tensor::TensorData;

    fn tensor(values: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn kl_values(mean: Vec<f32>, sigma_raw: Vec<f32>, beta: f64) -> Vec<f32> {
        let (_, sigma_sq, log_sigma_sq) = sigma_terms(tensor(sigma_raw, [2, 2]));
        loss::kl_divergence(tensor(mean, [2, 2]), sigma_sq, log_sigma_sq, beta)
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    fn quiet_config() -> VaeConfig {
        VaeConfig {
            model: ModelConfig { log_level: LogLevel::Warn, seed: Some(3), ..VaeConfig::default().model },
            ..VaeConfig::default()
        }
    }

    fn surface_data(rows: usize) -> Tensor<TestAutodiffBackend, 2> {
        let mut points = synthetic::surface_samples(rows, &mut make_rng(Some(17)));
        synthetic::standardize(&mut points);
        synthetic::rows_to_tensor(&points, &Default::default())
    }

    #[test]
    fn test_kl_with_unit_sigma_is_half_beta_mean_squares() {
        // σ = ±1: −1 − ln 1 + 1 cancels, leaving μ²
        let kl = kl_values(vec![1.0, 2.0, 0.0, -3.0], vec![1.0, -1.0, 1.0, 1.0], 0.5);
        assert!((kl[0] - 0.25 * 5.0).abs() < 1e-5);
        assert!((kl[1] - 0.25 * 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_kl_with_zero_sigma_is_finite() {
        let kl = kl_values(vec![1.0, 0.0, 0.0, 0.0], vec![0.0; 4], 1.0);
        let ln_eps = (LOG_EPSILON as f32).ln();
        assert!(ln_eps < -103.0);
        for (value, mean_sq) in kl.iter().zip([1.0f32, 0.0]) {
            assert!(value.is_finite());
            let expected = 0.5 * (2.0 * (-1.0 - ln_eps) + mean_sq);
            assert!((value - expected).abs() < 1e-3, "{value} vs {expected}");
        }
    }

    #[test]
    fn test_negative_sigma_head_gives_positive_sigma() {
        let (sigma, sigma_sq, _) = sigma_terms(tensor(vec![-2.0, 0.5, 0.0, -0.1], [2, 2]));
        assert_eq!(sigma.into_data().to_vec::<f32>().unwrap(), vec![2.0, 0.5, 0.0, 0.1]);
        let sq = sigma_sq.into_data().to_vec::<f32>().unwrap();
        assert!((sq[0] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let config = VaeConfig { n_hidden: vec![8, 6], latent_size: 4, ..VaeConfig::default() };
        let net    = config.init_net::<TestBackend>(&device);
        let out    = net.forward(Tensor::ones([5, 3], &device), Activation::Relu, None);

        assert_eq!(out.reconstruction.dims(), [5, 3]);
        assert_eq!(out.latent.dims(), [5, 4]);
        assert_eq!(out.log_sigma_sq.dims(), [5, 4]);
        assert_eq!(net.decoder.layers[0].linear.weight.dims(), [4, 6]);
    }

    #[test]
    fn test_noise_is_shared_across_the_batch() {
        let device = Default::default();
        let config = VaeConfig { n_hidden: vec![8], latent_size: 2, ..VaeConfig::default() };
        let net    = config.init_net::<TestBackend>(&device);
        let out    = net.forward(Tensor::ones([3, 3], &device), Activation::Relu, None);

        let latent = out.latent.into_data().to_vec::<f32>().unwrap();
        assert_eq!(latent[0..2], latent[2..4]);
        assert_eq!(latent[0..2], latent[4..6]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let device = Default::default();
        let config = VaeConfig { n_hidden: vec![], ..quiet_config() };
        assert!(VaeModel::<TestAutodiffBackend>::new(config, &device).is_err());
    }

    #[test]
    fn test_config_round_trip_keeps_callables() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vae.json");
        let config = VaeConfig {
            hidden_activation:   Callable(Activation::Tanh),
            output_activation:   Some(Callable(Activation::Sigmoid)),
            optimizer:           Callable(OptimizerKind::Sgd),
            reconstruction_loss: Callable(ReconstructionLoss::MeanOfSquaredDifferences),
            n_hidden:            vec![32, 16, 8],
            ..VaeConfig::default()
        };
        config.try_save(&path).unwrap();

        let mut loaded = VaeConfig::default();
        loaded.load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_training_lowers_loss() {
        let device = Default::default();
        let data   = TrainingData::new(Split::autoencoding(surface_data(200)), None);
        let args   = VaeArgs { learning_rate: 1e-2, beta: 0.0 };

        let mut model = VaeModel::<TestAutodiffBackend>::new(quiet_config(), &device).unwrap();
        let (first, _) = model.train(Some(&data), Some(20), &args).unwrap();
        let mut last = first;
        for _ in 0..30 {
            last = model.train(Some(&data), Some(20), &args).unwrap().0;
        }
        assert!(last.is_finite());
        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn test_batch_norm_variant_trains_and_validates() {
        let device = Default::default();
        let config = VaeConfig { use_bn: true, optimizer: Callable(OptimizerKind::AdamW), ..quiet_config() };
        let x      = surface_data(40);
        let data   = TrainingData::new(Split::autoencoding(x.clone()), Some(Split::autoencoding(x)));

        let mut model = VaeModel::<TestAutodiffBackend>::new(config, &device).unwrap();
        let (train, valid) = model.train(Some(&data), Some(10), &VaeArgs::default()).unwrap();
        assert!(train.is_finite());
        assert!(valid.is_finite());
    }

    #[test]
    fn test_restored_model_encodes_identically() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut config = quiet_config();
        config.model.checkpoints_root = Some(tmp.path().to_path_buf());

        let x    = surface_data(30);
        let data = TrainingData::new(Split::autoencoding(x.clone()), None);

        let mut model = VaeModel::<TestAutodiffBackend>::new(config, &device).unwrap();
        model.train(Some(&data), Some(10), &VaeArgs::default()).unwrap();
        model.save().unwrap();
        let run_dir = model.checkpoint_dir().unwrap().to_path_buf();

        let mut restored = VaeModel::<TestAutodiffBackend>::from_checkpoint(&run_dir, &device).unwrap();
        restored.restore_latest(&run_dir).unwrap();

        let (mean_a, _) = model.inner().latent_statistics(x.clone().inner());
        let (mean_b, _) = restored.inner().latent_statistics(x.inner());
        let a = mean_a.into_data().to_vec::<f32>().unwrap();
        let b = mean_b.into_data().to_vec::<f32>().unwrap();
        for (va, vb) in a.iter().zip(&b) {
            assert!((va - vb).abs() < 1e-6);
        }
    }

    #[test]
    fn test_infer_reconstructs_every_row() {
        let device = Default::default();
        let model  = VaeModel::<TestAutodiffBackend>::new(quiet_config(), &device).unwrap();
        let out    = model.infer(&surface_data(12), Some(4), &VaeArgs::default()).unwrap();
        assert_eq!(out.dims(), [12, 3]);
    }
}
