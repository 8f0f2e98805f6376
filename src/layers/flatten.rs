//! Flatten layer: a reversible reshape, no computation.

use super::Layer;
use crate::mat::Mat;

/// Flattens any `rows x cols` input to `1 x (rows * cols)` by mutating the
/// shape descriptor in place (the storage is untouched) and restores the
/// recorded shape on the way back.
#[derive(Default)]
pub struct Flatten {
    in_shape: Option<(usize, usize)>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for Flatten {
    fn forward(&mut self, mut input: Mat) -> Mat {
        let shape = (input.rows(), input.cols());
        input.reshape(1, shape.0 * shape.1);
        self.in_shape = Some(shape);
        input
    }

    fn backward(&mut self, mut delta: Mat) -> Mat {
        let (rows, cols) = self
            .in_shape
            .take()
            .expect("flatten backward called without a matching forward");
        delta.reshape(rows, cols);
        delta
    }
}
