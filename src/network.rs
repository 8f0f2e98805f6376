//! Ordered layer composition, the minibatch training loop, and the
//! injected metrics collector.

use crate::checkpoint::CheckpointReader;
use crate::layers::Layer;
use crate::mat::Mat;
use crate::optim::Sgd;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

/// Wall-time and call-count instrumentation, owned by the [`Network`] and
/// read by reference. Replaces process-wide counters: two networks in one
/// process never share a collector.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub forward_calls: u64,
    pub forward_time: Duration,
    pub backward_calls: u64,
    pub backward_time: Duration,
    pub updates: u64,
}

/// An ordered composition of layers plus a cost-gradient function.
///
/// The cost function maps `(result, target)` to the seed gradient for the
/// backward pass. The default is the residual `result - target`, the
/// combined gradient of softmax paired with cross-entropy (and of identity
/// paired with squared error up to a constant factor).
///
/// A `Network` is single-owner state: forward/backward take `&mut self`,
/// so one instance cannot be driven from two training threads at once.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    cost: Box<dyn Fn(&Mat, &Mat) -> Mat>,
    metrics: Metrics,
}

impl Network {
    /// Composes `layers` with the default residual cost gradient.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Self::with_cost(layers, Box::new(|result, target| result.sub(target)))
    }

    /// Composes `layers` with an explicit cost-gradient function.
    pub fn with_cost(layers: Vec<Box<dyn Layer>>, cost: Box<dyn Fn(&Mat, &Mat) -> Mat>) -> Self {
        Self {
            layers,
            cost,
            metrics: Metrics::default(),
        }
    }

    /// Samples every layer's parameters from a deterministically seeded
    /// entropy source.
    pub fn init(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for layer in &mut self.layers {
            layer.randomize(&mut rng);
        }
    }

    /// Runs one sample through the layer chain.
    pub fn forward(&mut self, input: Mat) -> Mat {
        let start = Instant::now();
        let mut activation = input;
        for layer in &mut self.layers {
            activation = layer.forward(activation);
        }
        self.metrics.forward_time += start.elapsed();
        self.metrics.forward_calls += 1;
        activation
    }

    /// Seeds the gradient from the cost function and threads it backward
    /// through the layer chain, accumulating per-layer gradients.
    pub fn backward(&mut self, result: &Mat, target: &Mat) {
        let start = Instant::now();
        let mut delta = (self.cost)(result, target);
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(delta);
        }
        self.metrics.backward_time += start.elapsed();
        self.metrics.backward_calls += 1;
    }

    /// One full pass over the optimizer's corpus in freshly shuffled order,
    /// applying parameter updates at every minibatch boundary.
    ///
    /// The update divisor is the number of samples actually accumulated,
    /// so a short final batch is scaled the same as a full one.
    pub fn train(&mut self, optimizer: &mut Sgd, rng: &mut StdRng) {
        optimizer.shuffle(rng);
        let n = optimizer.len();
        let batch = optimizer.batch_size();
        let mut start = 0;
        while start < n {
            let end = (start + batch).min(n);
            for index in start..end {
                let (input, target) = optimizer.sample(index);
                let input = input.clone();
                let result = self.forward(input);
                self.backward(&result, target);
            }
            for layer in &mut self.layers {
                layer.apply_update(optimizer, end - start);
            }
            self.metrics.updates += 1;
            start = end;
        }
    }

    /// Clears recurrent state in every layer (a no-op for stateless ones).
    pub fn reset_state(&mut self) {
        for layer in &mut self.layers {
            layer.reset_state();
        }
    }

    /// Writes every layer's parameters in order.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn save_checkpoint(&self, out: &mut dyn Write) -> std::io::Result<()> {
        for layer in &self.layers {
            layer.save(out)?;
        }
        Ok(())
    }

    /// Reads every layer's parameters in the same order they were saved.
    /// The format is positional: the layer list must match the saving
    /// network exactly.
    ///
    /// # Errors
    /// Returns an error on a missing, truncated, or malformed checkpoint.
    pub fn load_checkpoint(&mut self, src: &mut dyn BufRead) -> Result<(), Box<dyn Error>> {
        let mut reader = CheckpointReader::new(src);
        for layer in &mut self.layers {
            layer.load(&mut reader)?;
        }
        Ok(())
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }
}
