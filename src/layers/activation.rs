//! Elementwise activation layers and the softmax output layer.
//!
//! An activation is a strategy value ([`Activation`]) held by composition,
//! not a layer supertype; the recurrent layers hold one too.

use super::Layer;
use crate::mat::Mat;
use crate::math;

/// Elementwise activation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Sigmoid,
    Relu,
    Tanh,
}

impl Activation {
    /// Applies the activation in place.
    pub fn apply(&self, m: &mut Mat) {
        match self {
            Activation::Sigmoid => math::sigmoid(m),
            Activation::Relu => math::relu(m),
            Activation::Tanh => math::tanh(m),
        }
    }

    /// Replaces each pre-activation with the activation's derivative at it.
    pub fn apply_prime(&self, m: &mut Mat) {
        match self {
            Activation::Sigmoid => math::sigmoid_prime(m),
            Activation::Relu => math::relu_prime(m),
            Activation::Tanh => math::tanh_prime(m),
        }
    }
}

/// A layer applying one [`Activation`] elementwise.
///
/// Caches the pre-activation input; backward multiplies the incoming
/// gradient elementwise by the derivative evaluated at that cache.
pub struct ActivationLayer {
    kind: Activation,
    cache: Option<Mat>,
}

impl ActivationLayer {
    pub fn new(kind: Activation) -> Self {
        Self { kind, cache: None }
    }

    pub fn sigmoid() -> Self {
        Self::new(Activation::Sigmoid)
    }

    pub fn relu() -> Self {
        Self::new(Activation::Relu)
    }

    pub fn tanh() -> Self {
        Self::new(Activation::Tanh)
    }
}

impl Layer for ActivationLayer {
    fn forward(&mut self, mut input: Mat) -> Mat {
        self.cache = Some(input.clone());
        self.kind.apply(&mut input);
        input
    }

    fn backward(&mut self, mut delta: Mat) -> Mat {
        let mut pre = self
            .cache
            .take()
            .expect("activation backward called without a matching forward");
        self.kind.apply_prime(&mut pre);
        delta.hadamard_assign(&pre);
        delta
    }
}

/// Row-wise softmax output layer.
///
/// Backward is a pass-through: the layer assumes the network's cost
/// function already supplies the combined softmax/cross-entropy gradient
/// (`result - target`), so no Jacobian is applied here.
pub struct Softmax;

impl Layer for Softmax {
    fn forward(&mut self, mut input: Mat) -> Mat {
        math::softmax(&mut input);
        input
    }

    fn backward(&mut self, delta: Mat) -> Mat {
        delta
    }
}
