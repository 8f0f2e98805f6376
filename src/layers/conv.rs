//! Convolution layer, serial by default with an opt-in rayon-parallel
//! variant.
//!
//! Weights live in a `(channels * count) x (k_h * k_w)` buffer; row
//! `i * count + j` holds the kernel correlating input channel `i` into
//! output channel `j`. Forward runs im2col once over the input, then a
//! per-output-channel window product plus bias. Backward re-runs im2col on
//! the cached input (with the output size as the window) to derive the
//! weight gradient, and scatters the input-space gradient back through
//! col2im.
//!
//! The parallel variant fans the per-output-channel forward work and the
//! per-input-channel backward work across the rayon pool. Every parallel
//! write lands in a disjoint region (`par_chunks_mut`), and the bias
//! gradient is computed once outside the fan-out, so no shared accumulator
//! exists to lose updates. Joins are implicit in rayon's structured
//! iterators. Accumulation order matches the serial path per output region,
//! but callers comparing the two should still allow a small epsilon.

use super::Layer;
use crate::checkpoint::{self, CheckpointReader};
use crate::init::Init;
use crate::mat::{self, KernelMut, Mat};
use crate::optim::Optimizer;
use crate::spatial;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::error::Error;
use std::io::Write;

/// 2D convolution over a `channels x height x width` slab.
pub struct Conv {
    channels: usize,
    height: usize,
    width: usize,
    count: usize,
    k_h: usize,
    k_w: usize,
    stride: usize,
    padding: usize,
    out_size: (usize, usize),
    w: Mat,
    b: Mat,
    nabla_w: Mat,
    nabla_b: Mat,
    cache: Option<Mat>,
    init: Init,
    parallel: bool,
}

impl Conv {
    /// Builds a convolution of `count` kernels of `k_h x k_w` over a
    /// `channels x height x width` input, Kaiming-initialized over the
    /// receptive-field fan.
    pub fn new(
        height: usize,
        width: usize,
        channels: usize,
        k_h: usize,
        k_w: usize,
        count: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        Self::with_init(
            height,
            width,
            channels,
            k_h,
            k_w,
            count,
            stride,
            padding,
            Init::kaiming(channels * k_h * k_w),
        )
    }

    /// Builds a convolution with an explicit initialization strategy.
    #[allow(clippy::too_many_arguments)]
    pub fn with_init(
        height: usize,
        width: usize,
        channels: usize,
        k_h: usize,
        k_w: usize,
        count: usize,
        stride: usize,
        padding: usize,
        init: Init,
    ) -> Self {
        let out_size = spatial::compute_output_size(height, width, k_h, k_w, stride, padding);
        Self {
            channels,
            height,
            width,
            count,
            k_h,
            k_w,
            stride,
            padding,
            out_size,
            w: Mat::zeros(channels * count, k_h * k_w),
            b: Mat::zeros(count, 1),
            nabla_w: Mat::zeros(channels * count, k_h * k_w),
            nabla_b: Mat::zeros(count, 1),
            cache: None,
            init,
            parallel: false,
        }
    }

    /// Fans per-channel work across the rayon pool.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn out_size(&self) -> (usize, usize) {
        self.out_size
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

    fn k_area(&self) -> usize {
        self.k_h * self.k_w
    }

    fn out_area(&self) -> usize {
        self.out_size.0 * self.out_size.1
    }
}

impl Layer for Conv {
    fn forward(&mut self, input: Mat) -> Mat {
        assert!(
            input.rows() == self.channels && input.cols() == self.height * self.width,
            "conv input shape mismatch: expected {}x{}, got {}x{}",
            self.channels,
            self.height * self.width,
            input.rows(),
            input.cols()
        );
        let k_area = self.k_area();
        let out_area = self.out_area();

        let mut data_col = Mat::zeros(self.channels, k_area * out_area);
        spatial::im2col(
            &input,
            self.channels,
            self.height,
            self.width,
            (self.k_h, self.k_w),
            self.stride,
            self.padding,
            &mut data_col,
        );

        let mut y = Mat::zeros(self.count, out_area);
        let w = &self.w;
        let b = &self.b;
        let count = self.count;
        let channels = self.channels;

        if self.parallel {
            y.data
                .par_chunks_mut(out_area)
                .enumerate()
                .for_each(|(j, row)| {
                    let mut out = KernelMut::new(1, out_area, row);
                    for i in 0..channels {
                        let kernel = w.kernel(i * count + j, 1, k_area);
                        let col = data_col.kernel(i, k_area, out_area);
                        mat::multiply_acc(kernel, col, &mut out);
                    }
                    out.add_scalar(b.at(j, 0));
                });
        } else {
            for i in 0..channels {
                let col = data_col.kernel(i, k_area, out_area);
                for j in 0..count {
                    let kernel = w.kernel(i * count + j, 1, k_area);
                    let mut out = y.kernel_mut(j, 1, out_area);
                    mat::multiply_acc(kernel, col, &mut out);
                }
            }
            for j in 0..count {
                let theta = b.at(j, 0);
                y.kernel_mut(j, 1, out_area).add_scalar(theta);
            }
        }

        self.cache = Some(input);
        y
    }

    fn backward(&mut self, delta: Mat) -> Mat {
        let x = self
            .cache
            .take()
            .expect("conv backward called without a matching forward");
        assert!(
            delta.rows() == self.count && delta.cols() == self.out_area(),
            "conv delta shape mismatch: expected {}x{}, got {}x{}",
            self.count,
            self.out_area(),
            delta.rows(),
            delta.cols()
        );
        // The weight-gradient rearrangement (im2col with the output size as
        // the window) only lines up for unit stride; strided downsampling
        // belongs to pooling layers.
        assert_eq!(self.stride, 1, "conv backward requires unit stride");

        let k_area = self.k_area();
        let out_area = self.out_area();
        let count = self.count;
        let channels = self.channels;

        // Receptive-field rearrangement of the cached input: channel block
        // i, viewed out_area x k_area, correlates delta into the weight
        // gradient.
        let mut data_col = Mat::zeros(channels, out_area * k_area);
        spatial::im2col(
            &x,
            channels,
            self.height,
            self.width,
            self.out_size,
            self.stride,
            self.padding,
            &mut data_col,
        );

        // Bias gradient: one sum over each output channel's delta region.
        for j in 0..count {
            let s = delta.kernel(j, 1, out_area).sum();
            let acc = self.nabla_b.at(j, 0) + s;
            self.nabla_b.set(j, 0, acc);
        }

        let mut delta_w = Mat::zeros(channels * count, k_area);
        let mut ret_img = Mat::zeros(channels, k_area * out_area);
        let w = &self.w;

        if self.parallel {
            delta_w
                .data
                .par_chunks_mut(count * k_area)
                .zip(ret_img.data.par_chunks_mut(k_area * out_area))
                .enumerate()
                .for_each(|(i, (dw_chunk, ri_chunk))| {
                    let img = data_col.kernel(i, out_area, k_area);
                    for j in 0..count {
                        let d = delta.kernel(j, 1, out_area);
                        let mut dw =
                            KernelMut::new(1, k_area, &mut dw_chunk[j * k_area..(j + 1) * k_area]);
                        mat::multiply_acc(d, img, &mut dw);
                        let kernel = w.kernel(i * count + j, k_area, 1);
                        let mut out = KernelMut::new(k_area, out_area, &mut ri_chunk[..]);
                        mat::multiply_acc(kernel, d, &mut out);
                    }
                });
        } else {
            for i in 0..channels {
                let img = data_col.kernel(i, out_area, k_area);
                for j in 0..count {
                    let d = delta.kernel(j, 1, out_area);
                    let mut dw = delta_w.kernel_mut(i * count + j, 1, k_area);
                    mat::multiply_acc(d, img, &mut dw);
                    let kernel = w.kernel(i * count + j, k_area, 1);
                    let mut out = ret_img.kernel_mut(i, k_area, out_area);
                    mat::multiply_acc(kernel, d, &mut out);
                }
            }
        }

        let mut ret = Mat::zeros(channels, self.height * self.width);
        spatial::col2im(
            &ret_img,
            channels,
            self.height,
            self.width,
            (self.k_h, self.k_w),
            self.stride,
            self.padding,
            &mut ret,
        );
        self.nabla_w.add_assign(&delta_w);
        ret
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
