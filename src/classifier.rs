//! Fixed-topology feedforward classifier with on-line backpropagation.

use crate::error::{Result, WhistleError};
use crate::feature::{FeatureVector, ResultValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The three supported network shapes, named after their persisted
/// classifier-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// `WhsNNClassifier_32_16_1`: one 16-wide hidden layer.
    Small,
    /// `WhsNNClassifier_32_32_1`: one 32-wide hidden layer.
    Medium,
    /// `WhsNNClassifier_32_32_32_1`: two 32-wide hidden layers.
    Large,
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Small => "WhsNNClassifier_32_16_1",
            Topology::Medium => "WhsNNClassifier_32_32_1",
            Topology::Large => "WhsNNClassifier_32_32_32_1",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "WhsNNClassifier_32_16_1" => Ok(Topology::Small),
            "WhsNNClassifier_32_32_1" => Ok(Topology::Medium),
            "WhsNNClassifier_32_32_32_1" => Ok(Topology::Large),
            other => Err(WhistleError::unsupported(format!(
                "unknown classifier topology `{other}`"
            ))),
        }
    }

    /// Widths of each layer after the 32-wide input, ending in the
    /// single-neuron output layer.
    fn layer_widths(&self) -> Vec<usize> {
        match self {
            Topology::Small => vec![16, 1],
            Topology::Medium => vec![32, 1],
            Topology::Large => vec![32, 32, 1],
        }
    }

    fn learning_rate(&self) -> f64 {
        match self {
            Topology::Small | Topology::Medium => 1e-4,
            Topology::Large => 1e-3,
        }
    }

    pub fn total_weights(&self) -> usize {
        let mut total = 0;
        let mut input_width = 32;
        for &width in &self.layer_widths() {
            total += width * (input_width + 1);
            input_width = width;
        }
        total
    }
}

const MOMENTUM: f64 = 0.25;

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One fully-connected layer: `neurons` rows of `inputs + 1` weights
/// (bias at index 0), plus cached per-neuron inputs/outputs and momentum
/// for the last weight update.
#[derive(Debug, Clone)]
struct Layer {
    inputs: usize,
    neurons: usize,
    weights: Vec<f64>,
    cached_inputs: Vec<f64>,
    cached_outputs: Vec<f64>,
    momentum: Vec<f64>,
}

impl Layer {
    fn new(inputs: usize, neurons: usize) -> Self {
        Self {
            inputs,
            neurons,
            weights: vec![0.0; neurons * (inputs + 1)],
            cached_inputs: vec![0.0; inputs],
            cached_outputs: vec![0.0; neurons],
            momentum: vec![0.0; neurons * (inputs + 1)],
        }
    }

    fn weight(&self, neuron: usize, input: usize) -> f64 {
        self.weights[neuron * (self.inputs + 1) + input]
    }

    fn weight_mut(&mut self, neuron: usize, input: usize) -> &mut f64 {
        &mut self.weights[neuron * (self.inputs + 1) + input]
    }

    fn momentum_mut(&mut self, neuron: usize, input: usize) -> &mut f64 {
        &mut self.momentum[neuron * (self.inputs + 1) + input]
    }

    fn randomize(&mut self, rng: &mut ChaCha8Rng) {
        for w in &mut self.weights {
            *w = rng.gen_range(-2.0..=2.0);
        }
    }

    /// Forward pass; caches `input` and each neuron's output for backprop.
    fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        self.cached_inputs.copy_from_slice(input);
        let mut outputs = vec![0.0; self.neurons];
        for n in 0..self.neurons {
            let mut u = self.weight(n, 0);
            for (i, &x) in input.iter().enumerate() {
                u += self.weight(n, i + 1) * x;
            }
            outputs[n] = sigmoid(u);
        }
        self.cached_outputs = outputs.clone();
        outputs
    }
}

/// Neural network classifier matching one of the three fixed [`Topology`]
/// shapes, with a flat per-layer weight buffer rather than nested arrays.
#[derive(Debug, Clone)]
pub struct Classifier {
    topology: Topology,
    layers: Vec<Layer>,
}

impl Classifier {
    /// Builds a classifier with freshly randomized weights, uniform on
    /// `[-2, 2]` from a deterministic, seeded PRNG.
    pub fn randomized(topology: Topology, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut layers = Vec::new();
        let mut input_width = 32;
        for &width in &topology.layer_widths() {
            let mut layer = Layer::new(input_width, width);
            layer.randomize(&mut rng);
            layers.push(layer);
            input_width = width;
        }
        Self { topology, layers }
    }

    /// Reconstructs a classifier from persisted, big-endian `f32` weight
    /// data (layer-major, as produced by [`Classifier::serialize`]).
    pub fn from_bytes(topology: Topology, data: &[u8]) -> Result<Self> {
        if data.len() != topology.total_weights() * 4 {
            return Err(WhistleError::incompatible(format!(
                "classifier data is {} bytes, expected {}",
                data.len(),
                topology.total_weights() * 4
            )));
        }
        let mut layers = Vec::new();
        let mut input_width = 32;
        let mut cursor = 0;
        for &width in &topology.layer_widths() {
            let mut layer = Layer::new(input_width, width);
            for w in layer.weights.iter_mut() {
                let bytes: [u8; 4] = data[cursor..cursor + 4].try_into().unwrap();
                *w = f32::from_be_bytes(bytes) as f64;
                cursor += 4;
            }
            layers.push(layer);
            input_width = width;
        }
        Ok(Self { topology, layers })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Forward pass over the whole network, returning the single output
    /// score in `(0, 1)`.
    pub fn forward(&mut self, input: &FeatureVector) -> f64 {
        let mut activations = input.to_vec();
        for layer in &mut self.layers {
            activations = layer.forward(&activations);
        }
        activations[0]
    }

    /// Batched on-line backpropagation with momentum. Repeats full sweeps
    /// over `samples` (skipping entries with `label < 0`) until accuracy
    /// reaches `target_rate`, then returns the trained classifier.
    pub fn learn(topology: Topology, samples: &[ResultValue], target_rate: f64, seed: u64) -> Self {
        let mut classifier = Classifier::randomized(topology, seed);
        let rate = classifier.topology.learning_rate();
        let labelled: Vec<&ResultValue> = samples.iter().filter(|s| s.label >= 0).collect();

        loop {
            for sample in &labelled {
                classifier.train_one(&sample.vec, sample.label as f64, rate);
            }

            let mut correct = 0usize;
            for sample in &labelled {
                let score = classifier.forward(&sample.vec);
                let predicted = if score >= 0.5 { 1 } else { 0 };
                if predicted == sample.label {
                    correct += 1;
                }
            }
            let accuracy = if labelled.is_empty() {
                1.0
            } else {
                correct as f64 / labelled.len() as f64
            };
            if accuracy >= target_rate || labelled.is_empty() {
                break;
            }
        }
        classifier
    }

    fn train_one(&mut self, input: &FeatureVector, target: f64, rate: f64) {
        let _ = self.forward(input);

        // Output layer delta.
        let num_layers = self.layers.len();
        let mut deltas: Vec<Vec<f64>> = vec![Vec::new(); num_layers];
        {
            let out_layer = &self.layers[num_layers - 1];
            let o = out_layer.cached_outputs[0];
            deltas[num_layers - 1] = vec![o * (1.0 - o) * (target - o)];
        }

        // Hidden layer deltas, propagated backward.
        for l in (0..num_layers - 1).rev() {
            let neurons = self.layers[l].neurons;
            let mut layer_deltas = vec![0.0; neurons];
            for n in 0..neurons {
                let o = self.layers[l].cached_outputs[n];
                let mut sum = 0.0;
                let next = &self.layers[l + 1];
                for (k, &d) in deltas[l + 1].iter().enumerate() {
                    sum += next.weight(k, n + 1) * d;
                }
                layer_deltas[n] = o * (1.0 - o) * sum;
            }
            deltas[l] = layer_deltas;
        }

        // Weight update with momentum, per layer.
        for l in 0..num_layers {
            let neurons = self.layers[l].neurons;
            let inputs = self.layers[l].inputs;
            for n in 0..neurons {
                let delta = deltas[l][n];
                let bias_change = rate * delta + MOMENTUM * *self.layers[l].momentum_mut(n, 0);
                *self.layers[l].weight_mut(n, 0) += bias_change;
                *self.layers[l].momentum_mut(n, 0) = bias_change;
                for i in 0..inputs {
                    let x = self.layers[l].cached_inputs[i];
                    let change =
                        rate * delta * x + MOMENTUM * *self.layers[l].momentum_mut(n, i + 1);
                    *self.layers[l].weight_mut(n, i + 1) += change;
                    *self.layers[l].momentum_mut(n, i + 1) = change;
                }
            }
        }
    }

    /// Serializes weights layer-major as big-endian `f32`, matching
    /// `Pattern.classifier_data`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.topology.total_weights() * 4);
        for layer in &self.layers {
            for &w in &layer.weights {
                out.extend_from_slice(&(w as f32).to_be_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_pass_is_deterministic() {
        let mut c = Classifier::randomized(Topology::Small, 42);
        let input = [0.1; 32];
        let a = c.forward(&input);
        let b = c.forward(&input);
        assert_eq!(a, b);
        assert!(a > 0.0 && a < 1.0);
    }

    #[test]
    fn round_trips_through_bytes() {
        let c = Classifier::randomized(Topology::Small, 7);
        let bytes = c.serialize();
        assert_eq!(bytes.len(), Topology::Small.total_weights() * 4);
        let mut c2 = Classifier::from_bytes(Topology::Small, &bytes).unwrap();
        let mut c1 = c;
        let input = [0.2; 32];
        assert_eq!(c1.forward(&input), c2.forward(&input));
    }

    #[test]
    fn rejects_mismatched_data_length() {
        let bytes = vec![0u8; 10];
        assert!(Classifier::from_bytes(Topology::Small, &bytes).is_err());
    }

    #[test]
    fn topology_weight_counts_match_spec() {
        assert_eq!(Topology::Small.total_weights(), 545);
        assert_eq!(Topology::Medium.total_weights(), 1089);
        assert_eq!(Topology::Large.total_weights(), 2145);
    }

    #[test]
    fn learns_a_linearly_separable_split() {
        let mut samples = Vec::new();
        for i in 0..20 {
            let mut vec = [0.0; 32];
            vec[0] = 1.0;
            vec[1] = i as f64 * 0.01;
            samples.push(ResultValue::new(1, vec));
        }
        for i in 0..20 {
            let mut vec = [0.0; 32];
            vec[0] = -1.0;
            vec[1] = i as f64 * 0.01;
            samples.push(ResultValue::new(0, vec));
        }
        let mut classifier = Classifier::learn(Topology::Small, &samples, 0.9, 1);
        let mut correct = 0;
        for s in &samples {
            let score = classifier.forward(&s.vec);
            let predicted = if score >= 0.5 { 1 } else { 0 };
            if predicted == s.label {
                correct += 1;
            }
        }
        assert!(correct as f64 / samples.len() as f64 >= 0.9);
    }
}
