//! Parameter-update protocol and the stochastic gradient descent optimizer.
//!
//! An [`Optimizer`] owns the full labeled training corpus, produces a
//! shuffled iteration order from an explicit seedable entropy source, and
//! implements the update rule applied at minibatch boundaries. The update
//! divides by the number of samples *actually accumulated*, so a short
//! final batch is not under-scaled relative to the configured batch size.

use crate::mat::Mat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// The parameter-update rule invoked once per minibatch for every trainable
/// buffer of every layer.
pub trait Optimizer {
    /// Applies one update to `param` from the accumulated gradient `nabla`.
    ///
    /// `samples` is the number of per-sample gradients summed into `nabla`
    /// since the last update; the rule normalizes by it so the perceived
    /// learning rate is independent of the accumulation count.
    fn step(&self, param: &mut Mat, nabla: &Mat, samples: usize);
}

/// Stochastic gradient descent over an owned training corpus.
///
/// Update rule: `param -= (learning_rate / samples) * nabla`.
pub struct Sgd {
    learning_rate: f32,
    batch_size: usize,
    data: Vec<(Mat, Mat)>,
}

impl Sgd {
    /// Wraps a training corpus of (input, one-hot target) pairs.
    ///
    /// # Panics
    /// Panics on an empty corpus or a zero batch size; training on nothing
    /// is a caller error, not a state to limp through.
    pub fn new(data: Vec<(Mat, Mat)>, learning_rate: f32, batch_size: usize) -> Self {
        assert!(!data.is_empty(), "training corpus is empty");
        assert!(batch_size > 0, "batch size must be nonzero");
        Self {
            learning_rate,
            batch_size,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Borrows sample `index` in the current order.
    pub fn sample(&self, index: usize) -> &(Mat, Mat) {
        &self.data[index]
    }

    /// Reorders the corpus uniformly at random from the supplied source.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        self.data.shuffle(rng);
    }
}

impl Optimizer for Sgd {
    fn step(&self, param: &mut Mat, nabla: &Mat, samples: usize) {
        assert!(samples > 0, "update applied with no accumulated samples");
        let mut scaled = nabla.clone();
        scaled.scale(self.learning_rate / samples as f32);
        param.sub_assign(&scaled);
    }
}
