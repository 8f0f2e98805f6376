//! Fully-connected layer.

use super::Layer;
use crate::checkpoint::{self, CheckpointReader};
use crate::init::Init;
use crate::mat::Mat;
use crate::optim::Optimizer;
use rand::rngs::StdRng;
use std::error::Error;
use std::io::Write;

/// Dense layer: `y = x * W + b` over row-vector samples.
///
/// Backward accumulates `x^T * delta` into the weight accumulator and
/// `delta` into the bias accumulator, returning `delta * W^T` to the
/// previous layer.
pub struct Dense {
    w: Mat,
    b: Mat,
    nabla_w: Mat,
    nabla_b: Mat,
    cache: Option<Mat>,
    init: Init,
}

impl Dense {
    /// Builds a layer mapping `in_size` features to `out_size`, initialized
    /// Kaiming-style over the combined fan.
    pub fn new(in_size: usize, out_size: usize) -> Self {
        Self::with_init(in_size, out_size, Init::kaiming(in_size + out_size))
    }

    /// Builds a layer with an explicit initialization strategy.
    pub fn with_init(in_size: usize, out_size: usize, init: Init) -> Self {
        Self {
            w: Mat::zeros(in_size, out_size),
            b: Mat::zeros(1, out_size),
            nabla_w: Mat::zeros(in_size, out_size),
            nabla_b: Mat::zeros(1, out_size),
            cache: None,
            init,
        }
    }

    pub fn weights(&self) -> &Mat {
        &self.w
    }

    pub fn bias(&self) -> &Mat {
        &self.b
    }

    pub fn weights_mut(&mut self) -> &mut Mat {
        &mut self.w
    }

    pub fn bias_mut(&mut self) -> &mut Mat {
        &mut self.b
    }

    pub fn nabla_w(&self) -> &Mat {
        &self.nabla_w
    }

    pub fn nabla_b(&self) -> &Mat {
        &self.nabla_b
    }
}

impl Layer for Dense {
    fn forward(&mut self, input: Mat) -> Mat {
        let mut y = input.matmul(&self.w);
        y.add_assign(&self.b);
        self.cache = Some(input);
        y
    }

    fn backward(&mut self, delta: Mat) -> Mat {
        let x = self
            .cache
            .take()
            .expect("dense backward called without a matching forward");
        let delta_w = x.transpose().matmul(&delta);
        self.nabla_w.add_assign(&delta_w);
        self.nabla_b.add_assign(&delta);
        delta.matmul(&self.w.transpose())
    }

    fn randomize(&mut self, rng: &mut StdRng) {
        self.w.randomize(&self.init, rng);
        self.b.randomize(&self.init, rng);
    }

    fn apply_update(&mut self, optimizer: &dyn Optimizer, samples: usize) {
        optimizer.step(&mut self.w, &self.nabla_w, samples);
        optimizer.step(&mut self.b, &self.nabla_b, samples);
        self.nabla_w.clear();
        self.nabla_b.clear();
    }

    fn save(&self, out: &mut dyn Write) -> std::io::Result<()> {
        checkpoint::write_mat(out, &self.w)?;
        checkpoint::write_mat(out, &self.b)
    }

    fn load(&mut self, src: &mut CheckpointReader<'_>) -> Result<(), Box<dyn Error>> {
        self.w = src.read_mat()?;
        self.b = src.read_mat()?;
        Ok(())
    }
}
