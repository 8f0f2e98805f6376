//! Max and mean pooling layers.

use super::Layer;
use crate::mat::Mat;
use crate::spatial;

/// Pooling reduction applied per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Max,
    Mean,
}

/// Pooling over each channel of a `channels x height x width` slab.
///
/// No trainable parameters. Max pooling's backward routes each output
/// gradient to the argmax cell of its window (ties to the first maximum in
/// row-major scan order); mean pooling's backward spreads it evenly over
/// the window.
pub struct Pooling {
    channels: usize,
    height: usize,
    width: usize,
    pool: (usize, usize),
    stride: usize,
    out_size: (usize, usize),
    kind: PoolKind,
    cache: Option<Mat>,
}

impl Pooling {
    pub fn new(
        height: usize,
        width: usize,
        channels: usize,
        pool: (usize, usize),
        stride: usize,
        kind: PoolKind,
    ) -> Self {
        let out_size = spatial::compute_output_size(height, width, pool.0, pool.1, stride, 0);
        Self {
            channels,
            height,
            width,
            pool,
            stride,
            out_size,
            kind,
            cache: None,
        }
    }

    /// Max pooling.
    pub fn max(height: usize, width: usize, channels: usize, pool: (usize, usize), stride: usize) -> Self {
        Self::new(height, width, channels, pool, stride, PoolKind::Max)
    }

    /// Mean pooling.
    pub fn mean(height: usize, width: usize, channels: usize, pool: (usize, usize), stride: usize) -> Self {
        Self::new(height, width, channels, pool, stride, PoolKind::Mean)
    }

    pub fn out_size(&self) -> (usize, usize) {
        self.out_size
    }
}

impl Layer for Pooling {
    fn forward(&mut self, input: Mat) -> Mat {
        assert!(
            input.rows() == self.channels && input.cols() == self.height * self.width,
            "pooling input shape mismatch: expected {}x{}, got {}x{}",
            self.channels,
            self.height * self.width,
            input.rows(),
            input.cols()
        );
        let (out_h, out_w) = self.out_size;
        let mut y = Mat::zeros(self.channels, out_h * out_w);
        let slab = input.slab(&[self.channels, self.height, self.width]);
        for i in 0..self.channels {
            let img = slab.at(i).as_kernel(self.height, self.width);
            let mut out = y.kernel_mut(i, out_h, out_w);
            match self.kind {
                PoolKind::Max => spatial::max_pooling(img, &mut out, self.pool, self.stride),
                PoolKind::Mean => spatial::mean_pooling(img, &mut out, self.pool, self.stride),
            }
        }
        self.cache = Some(input);
        y
    }

    fn backward(&mut self, delta: Mat) -> Mat {
        let x = self
            .cache
            .take()
            .expect("pooling backward called without a matching forward");
        let (out_h, out_w) = self.out_size;
        let mut ret = Mat::zeros(self.channels, self.height * self.width);
        let img_slab = x.slab(&[self.channels, self.height, self.width]);
        let delta_slab = delta.slab(&[self.channels, out_h, out_w]);
        for i in 0..self.channels {
            let d = delta_slab.at(i).as_kernel(out_h, out_w);
            let mut out = ret.kernel_mut(i, self.height, self.width);
            match self.kind {
                PoolKind::Max => {
                    let img = img_slab.at(i).as_kernel(self.height, self.width);
                    spatial::max_pooling_prime(img, d, &mut out, self.pool, self.stride);
                }
                PoolKind::Mean => {
                    spatial::mean_pooling_prime(d, &mut out, self.pool, self.stride);
                }
            }
        }
        ret
    }
}
