//! Simple recurrent layer.
//!
//! Maintains its hidden state across successive forward calls on the same
//! sequence; call [`Layer::reset_state`] at a sequence boundary. The
//! backward pass is a truncated single-step gradient: it differentiates the
//! current step only and does not unroll through earlier time steps, so the
//! recurrent-weight accumulator receives each step's immediate contribution
//! rather than full backpropagation-through-time.

use super::{Activation, Layer};
use crate::checkpoint::{self, CheckpointReader};
use crate::init::Init;
use crate::mat::Mat;
use crate::optim::Optimizer;
use rand::rngs::StdRng;
use std::error::Error;
use std::io::Write;

struct RnnCache {
    x: Mat,
    h_prev: Mat,
    pre: Mat,
}

/// Recurrent layer: `h = act(x * Wi + h_prev * Wh + b)`.
pub struct Rnn {
    wi: Mat,
    wh: Mat,
    b: Mat,
    nabla_wi: Mat,
    nabla_wh: Mat,
    nabla_b: Mat,
    h: Mat,
    act: Activation,
    cache: Option<RnnCache>,
    init: Init,
}

impl Rnn {
    /// Builds a recurrent layer with a tanh activation, Kaiming-initialized
    /// over the hidden size.
    pub fn new(in_size: usize, hidden_size: usize) -> Self {
        Self::with_init(in_size, hidden_size, Init::kaiming(hidden_size), Activation::Tanh)
    }

    /// Builds a recurrent layer with explicit initialization and activation
    /// strategies.
    pub fn with_init(in_size: usize, hidden_size: usize, init: Init, act: Activation) -> Self {
        Self {
            wi: Mat::zeros(in_size, hidden_size),
            wh: Mat::zeros(hidden_size, hidden_size),
            b: Mat::zeros(1, hidden_size),
            nabla_wi: Mat::zeros(in_size, hidden_size),
            nabla_wh: Mat::zeros(hidden_size, hidden_size),
            nabla_b: Mat::zeros(1, hidden_size),
            h: Mat::zeros(1, hidden_size),
            act,
            cache: None,
            init,
        }
    }

    /// The current hidden state.
    pub fn hidden(&self) -> &Mat {
        &self.h
    }
}

impl Layer for Rnn {
    fn forward(&mut self, input: Mat) -> Mat {
        let h_prev = self.h.clone();
        let mut pre = input.matmul(&self.wi);
        pre.add_assign(&h_prev.matmul(&self.wh));
        pre.add_assign(&self.b);
        let mut y = pre.clone();
        self.act.apply(&mut y);
        self.h = y.clone();
        self.cache = Some(RnnCache {
            x: input,
            h_prev,
            pre,
        });
        y
    }

    fn backward(&mut self, mut delta: Mat) -> Mat {
        let RnnCache { x, h_prev, mut pre } = self
            .cache
            .take()
            .expect("rnn backward called without a matching forward");
        self.act.apply_prime(&mut pre);
        delta.hadamard_assign(&pre);
        self.nabla_wi.add_assign(&x.transpose().matmul(&delta));
        self.nabla_wh.add_assign(&h_prev.transpose().matmul(&delta));
        self.nabla_b.add_assign(&delta);
        delta.matmul(&self.wi.transpose())
    }

    fn randomize(&mut self, rng: &mut StdRng) {
        self.wi.randomize(&self.init, rng);
        self.wh.randomize(&self.init, rng);
        self.b.randomize(&self.init, rng);
    }

    fn apply_update(&mut self, optimizer: &dyn Optimizer, samples: usize) {
        optimizer.step(&mut self.wi, &self.nabla_wi, samples);
        optimizer.step(&mut self.wh, &self.nabla_wh, samples);
        optimizer.step(&mut self.b, &self.nabla_b, samples);
        self.nabla_wi.clear();
        self.nabla_wh.clear();
        self.nabla_b.clear();
    }

    fn save(&self, out: &mut dyn Write) -> std::io::Result<()> {
        checkpoint::write_mat(out, &self.wi)?;
        checkpoint::write_mat(out, &self.wh)?;
        checkpoint::write_mat(out, &self.b)
    }

    fn load(&mut self, src: &mut CheckpointReader<'_>) -> Result<(), Box<dyn Error>> {
        self.wi = src.read_mat()?;
        self.wh = src.read_mat()?;
        self.b = src.read_mat()?;
        Ok(())
    }

    fn reset_state(&mut self) {
        self.h.clear();
        self.cache = None;
    }
}
