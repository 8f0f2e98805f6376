//! Elementwise activation math operating in place on a [`Mat`].
//!
//! The `*_prime` functions follow the engine's convention of evaluating the
//! derivative from the *pre-activation* value, recomputing the activation
//! internally where needed. The `*_grad_from_output` variants exist for the
//! LSTM, which caches gate activations rather than pre-activations.
//!
//! Softmax has no standalone derivative here: the paired loss assumes the
//! caller supplies the already-combined softmax/cross-entropy gradient
//! (`result - target`), so the softmax layer's backward is a pass-through.

use crate::mat::Mat;

/// Applies the logistic sigmoid `1 / (1 + e^-x)` elementwise.
pub fn sigmoid(m: &mut Mat) {
    for v in &mut m.data {
        *v = 1.0 / (1.0 + (-*v).exp());
    }
}

/// Replaces each pre-activation `x` with `s * (1 - s)` where `s = sigmoid(x)`.
pub fn sigmoid_prime(m: &mut Mat) {
    for v in &mut m.data {
        let s = 1.0 / (1.0 + (-*v).exp());
        *v = s * (1.0 - s);
    }
}

/// Replaces each sigmoid *output* `s` with `s * (1 - s)`.
pub fn sigmoid_grad_from_output(m: &mut Mat) {
    for v in &mut m.data {
        *v = *v * (1.0 - *v);
    }
}

/// Applies `max(0, x)` elementwise.
pub fn relu(m: &mut Mat) {
    for v in &mut m.data {
        *v = v.max(0.0);
    }
}

/// Replaces each pre-activation with the ReLU step derivative.
///
/// ReLU is non-differentiable at 0; the derivative there is taken as 0.
pub fn relu_prime(m: &mut Mat) {
    for v in &mut m.data {
        *v = if *v > 0.0 { 1.0 } else { 0.0 };
    }
}

/// Applies the hyperbolic tangent elementwise.
pub fn tanh(m: &mut Mat) {
    for v in &mut m.data {
        *v = v.tanh();
    }
}

/// Replaces each pre-activation `x` with `1 - tanh(x)^2`.
pub fn tanh_prime(m: &mut Mat) {
    for v in &mut m.data {
        let t = v.tanh();
        *v = 1.0 - t * t;
    }
}

/// Replaces each tanh *output* `t` with `1 - t^2`.
pub fn tanh_grad_from_output(m: &mut Mat) {
    for v in &mut m.data {
        *v = 1.0 - *v * *v;
    }
}

/// Row-wise softmax with per-row max subtraction for numerical stability.
pub fn softmax(m: &mut Mat) {
    for i in 0..m.rows() {
        let row = m.row_mut(i);
        let mut max = f32::NEG_INFINITY;
        for &v in row.iter() {
            if v > max {
                max = v;
            }
        }
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
}
