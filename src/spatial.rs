//! Sliding-window primitives: shape arithmetic, im2col/col2im, direct
//! correlation, and max/mean pooling with their backward routings.
//!
//! Spatial buffers here are rank-3 slabs (channel x height x width) stored
//! as a [`Mat`] with one row per channel. `im2col` rearranges such a slab
//! into a matrix whose rows are flattened receptive fields so convolution
//! becomes a matrix product; `col2im` is its exact additive adjoint
//! (receptive fields overlap when the stride is smaller than the kernel, so
//! scattering must accumulate). The direct `conv`/`conv_transpose` routines
//! perform the same correlation without materializing the column matrix and
//! produce identical numeric results to the im2col path.

use crate::mat::{Kernel, KernelMut, Mat};

/// Output height/width of a sliding window:
/// `floor((in + 2 * pad - k) / stride) + 1` per axis.
///
/// The padded extent is summed before the kernel is subtracted, so a kernel
/// larger than the unpadded input is fine as long as padding covers it.
pub fn compute_output_size(
    in_height: usize,
    in_width: usize,
    kernel_height: usize,
    kernel_width: usize,
    stride: usize,
    padding: usize,
) -> (usize, usize) {
    let out_height = (in_height + 2 * padding - kernel_height) / stride + 1;
    let out_width = (in_width + 2 * padding - kernel_width) / stride + 1;
    (out_height, out_width)
}

fn im2col_get_pixel(
    input: &Mat,
    height: usize,
    width: usize,
    row: isize,
    col: isize,
    channel: usize,
    pad: usize,
) -> f32 {
    let row = row - pad as isize;
    let col = col - pad as isize;
    if row < 0 || col < 0 || row >= height as isize || col >= width as isize {
        return 0.0;
    }
    input.at(channel, col as usize + width * row as usize)
}

/// Rearranges a `channels x height x width` slab into a column matrix.
///
/// `out` must be shaped `channels x (k_h * k_w * out_h * out_w)`; row `c` of
/// `out`, viewed as a `(k_h * k_w) x (out_h * out_w)` window, holds channel
/// `c`'s receptive fields. Out-of-bounds samples read as zero padding.
pub fn im2col(
    input: &Mat,
    channels: usize,
    height: usize,
    width: usize,
    ksize: (usize, usize),
    stride: usize,
    pad: usize,
    out: &mut Mat,
) {
    let height_col = (height + 2 * pad - ksize.0) / stride + 1;
    let width_col = (width + 2 * pad - ksize.1) / stride + 1;

    let channels_col = channels * ksize.0 * ksize.1;
    assert_eq!(
        out.data.len(),
        channels_col * height_col * width_col,
        "im2col output length mismatch"
    );
    for c in 0..channels_col {
        let w_offset = c % ksize.1;
        let h_offset = (c / ksize.1) % ksize.0;
        let c_im = c / ksize.0 / ksize.1;
        for h in 0..height_col {
            for w in 0..width_col {
                let im_row = (h_offset + h * stride) as isize;
                let im_col = (w_offset + w * stride) as isize;
                let col_index = (c * height_col + h) * width_col + w;
                out.data[col_index] =
                    im2col_get_pixel(input, height, width, im_row, im_col, c_im, pad);
            }
        }
    }
}

fn col2im_add_pixel(
    im: &mut Mat,
    height: usize,
    width: usize,
    row: isize,
    col: isize,
    channel: usize,
    pad: usize,
    val: f32,
) {
    let row = row - pad as isize;
    let col = col - pad as isize;
    if row < 0 || col < 0 || row >= height as isize || col >= width as isize {
        return;
    }
    let idx = col as usize + width * row as usize;
    im.set(channel, idx, im.at(channel, idx) + val);
}

/// Additive scatter inverse of [`im2col`]: accumulates every column entry
/// back onto its source pixel in `out` (shaped `channels x (height * width)`).
pub fn col2im(
    input: &Mat,
    channels: usize,
    height: usize,
    width: usize,
    ksize: (usize, usize),
    stride: usize,
    pad: usize,
    out: &mut Mat,
) {
    let height_col = (height + 2 * pad - ksize.0) / stride + 1;
    let width_col = (width + 2 * pad - ksize.1) / stride + 1;

    let channels_col = channels * ksize.0 * ksize.1;
    assert_eq!(
        input.data.len(),
        channels_col * height_col * width_col,
        "col2im input length mismatch"
    );
    for c in 0..channels_col {
        let w_offset = c % ksize.1;
        let h_offset = (c / ksize.1) % ksize.0;
        let c_im = c / ksize.0 / ksize.1;
        for h in 0..height_col {
            for w in 0..width_col {
                let im_row = (h_offset + h * stride) as isize;
                let im_col = (w_offset + w * stride) as isize;
                let col_index = (c * height_col + h) * width_col + w;
                let val = input.data[col_index];
                col2im_add_pixel(out, height, width, im_row, im_col, c_im, pad, val);
            }
        }
    }
}

/// Direct correlation: `out[i][j] += sum_kl in[i*s + k - p][j*s + l - p] * kernel[k][l]`,
/// accumulating into `out` and treating out-of-bounds input as zero.
pub fn conv(input: Kernel<'_>, kernel: Kernel<'_>, out: &mut KernelMut<'_>, stride: usize, padding: usize) {
    for i in 0..out.rows() {
        for j in 0..out.cols() {
            for k in 0..kernel.rows() {
                for l in 0..kernel.cols() {
                    let x = (i * stride + k) as isize - padding as isize;
                    let y = (j * stride + l) as isize - padding as isize;
                    if x >= 0 && (x as usize) < input.rows() && y >= 0 && (y as usize) < input.cols() {
                        let v = input.at(x as usize, y as usize) * kernel.at(k, l);
                        out.add_at(i, j, v);
                    }
                }
            }
        }
    }
}

/// Transposed correlation: scatters each input cell through the kernel into
/// `out`, the adjoint of [`conv`] for the same stride and padding.
pub fn conv_transpose(
    input: Kernel<'_>,
    kernel: Kernel<'_>,
    out: &mut KernelMut<'_>,
    stride: usize,
    padding: usize,
) {
    for i in 0..input.rows() {
        for j in 0..input.cols() {
            for k in 0..kernel.rows() {
                for l in 0..kernel.cols() {
                    let x = (i * stride + k) as isize - padding as isize;
                    let y = (j * stride + l) as isize - padding as isize;
                    if x >= 0 && (x as usize) < out.rows() && y >= 0 && (y as usize) < out.cols() {
                        let v = input.at(i, j) * kernel.at(k, l);
                        out.add_at(x as usize, y as usize, v);
                    }
                }
            }
        }
    }
}

/// Max pooling: each output cell is the maximum of its window.
///
/// The running maximum starts at negative infinity so all-negative windows
/// pool correctly.
pub fn max_pooling(input: Kernel<'_>, out: &mut KernelMut<'_>, size: (usize, usize), stride: usize) {
    for i in 0..out.rows() {
        for j in 0..out.cols() {
            let mut max = f32::NEG_INFINITY;
            for k in 0..size.0 {
                for l in 0..size.1 {
                    let x = i * stride + k;
                    let y = j * stride + l;
                    if x < input.rows() && y < input.cols() && input.at(x, y) > max {
                        max = input.at(x, y);
                    }
                }
            }
            out.set(i, j, max);
        }
    }
}

/// Mean pooling: each output cell is the mean of its window, with the
/// divisor fixed at the full window area.
pub fn mean_pooling(input: Kernel<'_>, out: &mut KernelMut<'_>, size: (usize, usize), stride: usize) {
    let area = (size.0 * size.1) as f32;
    for i in 0..out.rows() {
        for j in 0..out.cols() {
            let mut sum = 0.0;
            for k in 0..size.0 {
                for l in 0..size.1 {
                    let x = i * stride + k;
                    let y = j * stride + l;
                    if x < input.rows() && y < input.cols() {
                        sum += input.at(x, y);
                    }
                }
            }
            out.set(i, j, sum / area);
        }
    }
}

/// Backward routing for max pooling: each output gradient lands exactly on
/// the argmax input cell of its window and nowhere else.
///
/// Ties break to the first maximum in row-major scan order; overlapping
/// windows accumulate.
pub fn max_pooling_prime(
    img: Kernel<'_>,
    delta: Kernel<'_>,
    out: &mut KernelMut<'_>,
    size: (usize, usize),
    stride: usize,
) {
    for i in 0..delta.rows() {
        for j in 0..delta.cols() {
            let mut max = f32::NEG_INFINITY;
            let mut max_x = 0;
            let mut max_y = 0;
            for k in 0..size.0 {
                for l in 0..size.1 {
                    let x = i * stride + k;
                    let y = j * stride + l;
                    if x < img.rows() && y < img.cols() && img.at(x, y) > max {
                        max = img.at(x, y);
                        max_x = x;
                        max_y = y;
                    }
                }
            }
            out.add_at(max_x, max_y, delta.at(i, j));
        }
    }
}

/// Backward routing for mean pooling: each output gradient is distributed
/// evenly (`1 / (k_h * k_w)`) over the window, accumulating where windows
/// overlap so total gradient mass is conserved.
pub fn mean_pooling_prime(
    delta: Kernel<'_>,
    out: &mut KernelMut<'_>,
    size: (usize, usize),
    stride: usize,
) {
    let area = (size.0 * size.1) as f32;
    for i in 0..delta.rows() {
        for j in 0..delta.cols() {
            for k in 0..size.0 {
                for l in 0..size.1 {
                    let x = i * stride + k;
                    let y = j * stride + l;
                    if x < out.rows() && y < out.cols() {
                        out.add_at(x, y, delta.at(i, j) / area);
                    }
                }
            }
        }
    }
}
