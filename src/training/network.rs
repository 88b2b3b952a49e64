use crate::training::ModelError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

const LEAKY_SLOPE: f64 = 0.2;
const RMS_RHO: f64 = 0.9;
const RMS_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    LeakyRelu,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Tanh => z.tanh(),
            Activation::LeakyRelu => {
                if z > 0.0 {
                    z
                } else {
                    LEAKY_SLOPE * z
                }
            }
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            Activation::Linear => z,
        }
    }

    /// Derivative expressed through the pre-activation `z` and output `a`
    fn derivative(self, z: f64, a: f64) -> f64 {
        match self {
            Activation::Tanh => 1.0 - a * a,
            Activation::LeakyRelu => {
                if z > 0.0 {
                    1.0
                } else {
                    LEAKY_SLOPE
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Linear => 1.0,
        }
    }
}

/// Hidden layer: dense units, activation, then dropout
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub units: usize,
    pub activation: Activation,
    pub dropout: f64,
}

impl LayerSpec {
    pub fn new(units: usize, activation: Activation, dropout: f64) -> Self {
        Self {
            units,
            activation,
            dropout,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Hidden layers; a single linear output unit is always appended
    pub hidden: Vec<LayerSpec>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Trailing fraction of the training rows held out for validation loss
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden: vec![
                LayerSpec::new(384, Activation::Tanh, 0.1),
                LayerSpec::new(192, Activation::LeakyRelu, 0.3),
                LayerSpec::new(320, Activation::Sigmoid, 0.3),
            ],
            learning_rate: 0.00012122536697831619,
            epochs: 200,
            batch_size: 64,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Dense {
    /// `weights[out][in]`
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    activation: Activation,
    dropout: f64,
    weight_cache: Vec<Vec<f64>>,
    bias_cache: Vec<f64>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    fn new(inputs: usize, spec: &LayerSpec, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + spec.units) as f64).sqrt();
        let weights = (0..spec.units)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-limit..=limit)).collect())
            .collect();
        Self {
            weights,
            bias: vec![0.0; spec.units],
            activation: spec.activation,
            dropout: spec.dropout,
            weight_cache: vec![vec![0.0; inputs]; spec.units],
            bias_cache: vec![0.0; spec.units],
        }
    }

    fn pre_activation(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(input).map(|(w, x)| w * x).sum::<f64>())
            .collect()
    }
}

/// Per-layer values kept from the forward pass for backpropagation
struct Trace {
    inputs: Vec<f64>,
    z: Vec<f64>,
    a: Vec<f64>,
    mask: Vec<f64>,
}

struct Gradients {
    weights: Vec<Vec<Vec<f64>>>,
    bias: Vec<Vec<f64>>,
}

impl Gradients {
    fn zeros(layers: &[Dense]) -> Self {
        Self {
            weights: layers
                .iter()
                .map(|l| vec![vec![0.0; l.weights[0].len()]; l.weights.len()])
                .collect(),
            bias: layers.iter().map(|l| vec![0.0; l.bias.len()]).collect(),
        }
    }
}

/// Standardisation of the (already log) target, fitted on the training rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetScale {
    pub mean: f64,
    pub std: f64,
}

impl TargetScale {
    pub fn fit(targets: &[f64]) -> Self {
        let n = targets.len().max(1) as f64;
        let mean = targets.iter().sum::<f64>() / n;
        let std = (targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n).sqrt();
        Self {
            mean,
            std: if std > f64::EPSILON { std } else { 1.0 },
        }
    }

    pub fn apply(&self, target: f64) -> f64 {
        (target - self.mean) / self.std
    }

    pub fn restore(&self, scaled: f64) -> f64 {
        scaled * self.std + self.mean
    }
}

/// Per-epoch mean squared error
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

/// Feed-forward regressor trained with RMSprop on mean squared error
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Dense>,
}

impl Network {
    pub fn new(inputs: usize, config: &NetworkConfig) -> Result<Self, ModelError> {
        if inputs == 0 {
            return Err(ModelError::NoFeatures);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let output = LayerSpec::new(1, Activation::Linear, 0.0);

        let mut layers = Vec::with_capacity(config.hidden.len() + 1);
        let mut width = inputs;
        for spec in config.hidden.iter().chain(std::iter::once(&output)) {
            layers.push(Dense::new(width, spec, &mut rng));
            width = spec.units;
        }
        Ok(Self { layers })
    }

    pub fn predict(&self, input: &[f64]) -> f64 {
        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer
                .pre_activation(&activations)
                .into_iter()
                .map(|z| layer.activation.apply(z))
                .collect();
        }
        activations[0]
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn mse(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        x.iter()
            .zip(y)
            .map(|(row, t)| (self.predict(row) - t).powi(2))
            .sum::<f64>()
            / x.len() as f64
    }

    /// Mini-batch training. The last `validation_split` of the rows is only
    /// used to report validation loss.
    pub fn fit(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        config: &NetworkConfig,
    ) -> Result<TrainingHistory, ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }

        let n_val = ((x.len() as f64) * config.validation_split.clamp(0.0, 1.0)) as usize;
        let n_train = x.len() - n_val;
        if n_train == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        let (x_train, x_val) = x.split_at(n_train);
        let (y_train, y_val) = y.split_at(n_train);

        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let mut order: Vec<usize> = (0..n_train).collect();
        let batch_size = config.batch_size.max(1);
        let mut history = TrainingHistory::default();

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let mut grads = Gradients::zeros(&self.layers);
                for &i in batch {
                    epoch_loss += self.backprop(&x_train[i], y_train[i], batch.len(), &mut grads, &mut rng);
                }
                self.apply(&grads, config.learning_rate);
            }

            history.loss.push(epoch_loss / n_train as f64);
            if n_val > 0 {
                history.val_loss.push(self.mse(x_val, y_val));
            }

            if (epoch + 1) % 20 == 0 {
                debug!(
                    "epoch {}/{}: loss {:.5} val_loss {:.5}",
                    epoch + 1,
                    config.epochs,
                    history.loss.last().copied().unwrap_or_default(),
                    history.val_loss.last().copied().unwrap_or_default()
                );
            }
        }

        Ok(history)
    }

    /// Accumulate gradients for one sample and return its squared error
    fn backprop(
        &self,
        input: &[f64],
        target: f64,
        batch_len: usize,
        grads: &mut Gradients,
        rng: &mut StdRng,
    ) -> f64 {
        let mut traces = Vec::with_capacity(self.layers.len());
        let mut activations = input.to_vec();

        for layer in &self.layers {
            let z = layer.pre_activation(&activations);
            let a: Vec<f64> = z.iter().map(|&z| layer.activation.apply(z)).collect();
            let keep = 1.0 - layer.dropout;
            let mask: Vec<f64> = if layer.dropout > 0.0 {
                (0..a.len())
                    .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
                    .collect()
            } else {
                vec![1.0; a.len()]
            };
            let output: Vec<f64> = a.iter().zip(&mask).map(|(a, m)| a * m).collect();
            traces.push(Trace {
                inputs: std::mem::replace(&mut activations, output),
                z,
                a,
                mask,
            });
        }

        let error = activations[0] - target;
        let mut upstream = vec![2.0 * error / batch_len as f64];

        for (idx, (layer, trace)) in self.layers.iter().zip(&traces).enumerate().rev() {
            let delta: Vec<f64> = upstream
                .iter()
                .enumerate()
                .map(|(j, g)| g * trace.mask[j] * layer.activation.derivative(trace.z[j], trace.a[j]))
                .collect();

            for (j, d) in delta.iter().enumerate() {
                grads.bias[idx][j] += d;
                for (k, x) in trace.inputs.iter().enumerate() {
                    grads.weights[idx][j][k] += d * x;
                }
            }

            if idx > 0 {
                let mut next = vec![0.0; trace.inputs.len()];
                for (j, d) in delta.iter().enumerate() {
                    for (k, w) in layer.weights[j].iter().enumerate() {
                        next[k] += d * w;
                    }
                }
                upstream = next;
            }
        }

        error * error
    }

    /// RMSprop step
    fn apply(&mut self, grads: &Gradients, learning_rate: f64) {
        for (idx, layer) in self.layers.iter_mut().enumerate() {
            for (j, row) in layer.weights.iter_mut().enumerate() {
                for (k, w) in row.iter_mut().enumerate() {
                    let g = grads.weights[idx][j][k];
                    let cache = &mut layer.weight_cache[j][k];
                    *cache = RMS_RHO * *cache + (1.0 - RMS_RHO) * g * g;
                    *w -= learning_rate * g / (cache.sqrt() + RMS_EPSILON);
                }
                let g = grads.bias[idx][j];
                let cache = &mut layer.bias_cache[j];
                *cache = RMS_RHO * *cache + (1.0 - RMS_RHO) * g * g;
                layer.bias[j] -= learning_rate * g / (cache.sqrt() + RMS_EPSILON);
            }
        }
    }
}
