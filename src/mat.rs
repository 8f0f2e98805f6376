//! Core matrix buffer and its zero-copy reinterpretation views.
//!
//! # Buffer/View Engine
//!
//! This module defines the dense 2D buffer every other part of the engine
//! computes on, plus two non-owning views that alias its storage under a
//! different shape without copying.
//!
//! It supports:
//! - Construction of row-major `Mat` buffers with a `rows`/`cols` shape
//! - Elementwise add/subtract (in place and copy-producing), Hadamard
//!   product, scalar multiply
//! - Matrix product with left-to-right summation order for reproducibility
//! - In-place `reshape` that mutates the shape descriptor while keeping the
//!   same storage (used by flatten layers)
//! - `Kernel`/`KernelMut` windows addressing a sub-block of a buffer as an
//!   independent matrix
//! - `Slab` reinterpretation of flat storage as N logical dimensions
//!   (e.g. channel x height x width)
//!
//! ## Design Highlights
//! - `Mat` owns its storage (`Vec<f32>`); invariant `rows * cols == len`
//!   holds at all times
//! - Views borrow the owning buffer, so the borrow checker rules out a view
//!   outliving its backing storage; mutations through a view are visible
//!   through the original buffer
//! - Shape mismatches and out-of-range indexing panic with descriptive
//!   messages rather than truncating silently
//!
//! ## Example
//!
//! ```rust
//! use nablanet::mat::Mat;
//! let m = Mat::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(m.at(1, 2), 6.0);
//! ```

use crate::init::Init;
use rand::rngs::StdRng;

/// A dense 2D matrix with owned, contiguous, row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    pub data: Vec<f32>,
}

impl Mat {
    /// Creates a matrix from a flat row-major buffer.
    ///
    /// # Panics
    /// Panics if `rows * cols` does not equal `data.len()`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            rows * cols,
            data.len(),
            "shape {rows}x{cols} is incompatible with {} data elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    /// Creates a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Bounds-checked element read.
    ///
    /// # Panics
    /// Panics if `r` or `c` lies outside the declared shape.
    pub fn at(&self, r: usize, c: usize) -> f32 {
        self.check_index(r, c);
        self.data[r * self.cols + c]
    }

    /// Bounds-checked element write.
    ///
    /// # Panics
    /// Panics if `r` or `c` lies outside the declared shape.
    pub fn set(&mut self, r: usize, c: usize, v: f32) {
        self.check_index(r, c);
        self.data[r * self.cols + c] = v;
    }

    fn check_index(&self, r: usize, c: usize) {
        assert!(
            r < self.rows && c < self.cols,
            "index [{r}][{c}] out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
    }

    /// Borrows row `r` as a slice.
    pub fn row(&self, r: usize) -> &[f32] {
        assert!(r < self.rows, "row {r} out of range for {} rows", self.rows);
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutably borrows row `r` as a slice.
    pub fn row_mut(&mut self, r: usize) -> &mut [f32] {
        assert!(r < self.rows, "row {r} out of range for {} rows", self.rows);
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutates the shape descriptor in place, keeping the same storage.
    ///
    /// This is an aliasing operation, not a copy: the element count must be
    /// preserved.
    ///
    /// # Panics
    /// Panics if `rows * cols` differs from the current element count.
    pub fn reshape(&mut self, rows: usize, cols: usize) {
        assert_eq!(
            rows * cols,
            self.data.len(),
            "cannot reshape {}x{} matrix to {rows}x{cols}",
            self.rows,
            self.cols
        );
        self.rows = rows;
        self.cols = cols;
    }

    fn check_same_shape(&self, other: &Mat, op: &str) {
        assert!(
            self.rows == other.rows && self.cols == other.cols,
            "{op} shape mismatch: {}x{} vs {}x{}",
            self.rows,
            self.cols,
            other.rows,
            other.cols
        );
    }

    /// Elementwise `self += other`.
    ///
    /// # Panics
    /// Panics on shape mismatch.
    pub fn add_assign(&mut self, other: &Mat) {
        self.check_same_shape(other, "add");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    /// Elementwise `self -= other`.
    ///
    /// # Panics
    /// Panics on shape mismatch.
    pub fn sub_assign(&mut self, other: &Mat) {
        self.check_same_shape(other, "sub");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a -= b;
        }
    }

    /// Elementwise `self + other`, producing a new buffer.
    pub fn add(&self, other: &Mat) -> Mat {
        let mut out = self.clone();
        out.add_assign(other);
        out
    }

    /// Elementwise `self - other`, producing a new buffer.
    pub fn sub(&self, other: &Mat) -> Mat {
        let mut out = self.clone();
        out.sub_assign(other);
        out
    }

    /// Elementwise (Hadamard) product `self *= other`.
    ///
    /// # Panics
    /// Panics on shape mismatch.
    pub fn hadamard_assign(&mut self, other: &Mat) {
        self.check_same_shape(other, "hadamard");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a *= b;
        }
    }

    /// Multiplies every element by `theta` in place.
    pub fn scale(&mut self, theta: f32) {
        for v in &mut self.data {
            *v *= theta;
        }
    }

    /// Matrix product `self (m x k) * other (k x n)`, producing a new
    /// `m x n` buffer.
    ///
    /// Summation runs left to right over the inner dimension so results are
    /// reproducible across implementations.
    ///
    /// # Panics
    /// Panics if the inner dimensions do not match.
    pub fn matmul(&self, other: &Mat) -> Mat {
        assert_eq!(
            self.cols, other.rows,
            "matmul shape mismatch: {}x{} * {}x{}",
            self.rows, self.cols, other.rows, other.cols
        );
        let mut out = Mat::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let r = self.data[i * self.cols + k];
                let out_row = &mut out.data[i * other.cols..(i + 1) * other.cols];
                for (o, b) in out_row.iter_mut().zip(&other.data[k * other.cols..(k + 1) * other.cols]) {
                    *o += b * r;
                }
            }
        }
        out
    }

    /// Returns the transpose as a new buffer.
    pub fn transpose(&self) -> Mat {
        let mut out = Mat::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        out
    }

    /// Zeroes every element, keeping the shape.
    pub fn clear(&mut self) {
        for v in &mut self.data {
            *v = 0.0;
        }
    }

    /// Fills the buffer with draws from `init` using the supplied entropy
    /// source.
    pub fn randomize(&mut self, init: &Init, rng: &mut StdRng) {
        for v in &mut self.data {
            *v = init.sample(rng);
        }
    }

    /// Copies columns `[start, start + len)` into a new matrix.
    ///
    /// # Panics
    /// Panics if the column range exceeds the declared shape.
    pub fn slice_cols(&self, start: usize, len: usize) -> Mat {
        assert!(
            start + len <= self.cols,
            "column range {start}..{} out of range for {} columns",
            start + len,
            self.cols
        );
        let mut out = Mat::zeros(self.rows, len);
        for i in 0..self.rows {
            out.row_mut(i).copy_from_slice(&self.row(i)[start..start + len]);
        }
        out
    }

    /// Reinterprets rows `[start_row, ...)` of this buffer as an independent
    /// `rows x cols` window. The window aliases this buffer's storage.
    ///
    /// # Panics
    /// Panics if the window extends past the underlying storage.
    pub fn kernel(&self, start_row: usize, rows: usize, cols: usize) -> Kernel<'_> {
        let start = start_row * self.cols;
        self.check_window(start, rows, cols);
        Kernel::new(rows, cols, &self.data[start..start + rows * cols])
    }

    /// Mutable counterpart of [`Mat::kernel`]. Writes through the window are
    /// visible through this buffer.
    pub fn kernel_mut(&mut self, start_row: usize, rows: usize, cols: usize) -> KernelMut<'_> {
        let start = start_row * self.cols;
        self.check_window(start, rows, cols);
        KernelMut::new(rows, cols, &mut self.data[start..start + rows * cols])
    }

    fn check_window(&self, start: usize, rows: usize, cols: usize) {
        assert!(
            start + rows * cols <= self.data.len(),
            "window {rows}x{cols} at offset {start} out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
    }

    /// Reinterprets the flat storage as an N-dimensional slab.
    pub fn slab<'a>(&'a self, dims: &[usize]) -> Slab<'a> {
        Slab::new(dims.to_vec(), &self.data)
    }
}

/// Concatenates two matrices column-wise, producing a new buffer.
///
/// # Panics
/// Panics if the row counts differ.
pub fn concat(a: &Mat, b: &Mat) -> Mat {
    assert_eq!(
        a.rows, b.rows,
        "concat row mismatch: {} vs {}",
        a.rows, b.rows
    );
    let mut out = Mat::zeros(a.rows, a.cols + b.cols);
    for i in 0..a.rows {
        out.row_mut(i)[..a.cols].copy_from_slice(a.row(i));
        out.row_mut(i)[a.cols..].copy_from_slice(b.row(i));
    }
    out
}

/// A non-owning window over a buffer's storage with its own shape.
///
/// The window borrows the owning buffer, so it cannot outlive it.
#[derive(Debug, Clone, Copy)]
pub struct Kernel<'a> {
    rows: usize,
    cols: usize,
    data: &'a [f32],
}

impl<'a> Kernel<'a> {
    /// Wraps a contiguous slice as a `rows x cols` window.
    ///
    /// # Panics
    /// Panics if the slice length does not match the shape product.
    pub fn new(rows: usize, cols: usize, data: &'a [f32]) -> Self {
        assert_eq!(
            rows * cols,
            data.len(),
            "window shape {rows}x{cols} is incompatible with {} elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Bounds-checked element read.
    ///
    /// # Panics
    /// Panics if `r` or `c` lies outside the declared shape.
    pub fn at(&self, r: usize, c: usize) -> f32 {
        assert!(
            r < self.rows && c < self.cols,
            "index [{r}][{c}] out of range for {}x{} window",
            self.rows,
            self.cols
        );
        self.data[r * self.cols + c]
    }

    /// Sums every element, left to right.
    pub fn sum(&self) -> f32 {
        let mut total = 0.0;
        for &v in self.data {
            total += v;
        }
        total
    }

    /// Copies the window out into an owning matrix.
    pub fn to_mat(&self) -> Mat {
        Mat::new(self.rows, self.cols, self.data.to_vec())
    }
}

/// Mutable counterpart of [`Kernel`]; writes alias the owning buffer.
#[derive(Debug)]
pub struct KernelMut<'a> {
    rows: usize,
    cols: usize,
    data: &'a mut [f32],
}

impl<'a> KernelMut<'a> {
    /// Wraps a contiguous mutable slice as a `rows x cols` window.
    ///
    /// # Panics
    /// Panics if the slice length does not match the shape product.
    pub fn new(rows: usize, cols: usize, data: &'a mut [f32]) -> Self {
        assert_eq!(
            rows * cols,
            data.len(),
            "window shape {rows}x{cols} is incompatible with {} elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Bounds-checked element read.
    pub fn at(&self, r: usize, c: usize) -> f32 {
        assert!(
            r < self.rows && c < self.cols,
            "index [{r}][{c}] out of range for {}x{} window",
            self.rows,
            self.cols
        );
        self.data[r * self.cols + c]
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, r: usize, c: usize, v: f32) {
        assert!(
            r < self.rows && c < self.cols,
            "index [{r}][{c}] out of range for {}x{} window",
            self.rows,
            self.cols
        );
        self.data[r * self.cols + c] = v;
    }

    /// Adds `v` into element `(r, c)`.
    pub fn add_at(&mut self, r: usize, c: usize, v: f32) {
        assert!(
            r < self.rows && c < self.cols,
            "index [{r}][{c}] out of range for {}x{} window",
            self.rows,
            self.cols
        );
        self.data[r * self.cols + c] += v;
    }

    /// Adds `theta` to every element (e.g. accumulating a bias over one
    /// output channel's region).
    pub fn add_scalar(&mut self, theta: f32) {
        for v in self.data.iter_mut() {
            *v += theta;
        }
    }

    /// Elementwise `self += other`.
    ///
    /// # Panics
    /// Panics on shape mismatch.
    pub fn add_assign(&mut self, other: Kernel<'_>) {
        assert!(
            self.rows == other.rows && self.cols == other.cols,
            "add shape mismatch: {}x{} vs {}x{}",
            self.rows,
            self.cols,
            other.rows,
            other.cols
        );
        for (a, b) in self.data.iter_mut().zip(other.data) {
            *a += b;
        }
    }
}

/// Accumulating window product: `out += a (m x k) * b (k x n)`.
///
/// Summation runs left to right over the inner dimension, matching
/// [`Mat::matmul`] so the two paths stay numerically identical.
///
/// # Panics
/// Panics if the inner dimensions or the output shape do not conform.
pub fn multiply_acc(a: Kernel<'_>, b: Kernel<'_>, out: &mut KernelMut<'_>) {
    assert_eq!(
        a.cols, b.rows,
        "multiply shape mismatch: {}x{} * {}x{}",
        a.rows, a.cols, b.rows, b.cols
    );
    assert!(
        out.rows == a.rows && out.cols == b.cols,
        "multiply output shape mismatch: expected {}x{}, got {}x{}",
        a.rows,
        b.cols,
        out.rows,
        out.cols
    );
    for i in 0..a.rows {
        for k in 0..a.cols {
            let r = a.data[i * a.cols + k];
            let out_row = &mut out.data[i * b.cols..(i + 1) * b.cols];
            for (o, v) in out_row.iter_mut().zip(&b.data[k * b.cols..(k + 1) * b.cols]) {
                *o += v * r;
            }
        }
    }
}

/// A non-owning reinterpretation of flat storage as N logical dimensions.
///
/// Indexing by the leading dimension returns a sub-slab; a rank-2 sub-slab
/// can be addressed as a [`Kernel`] for primitive calls.
#[derive(Debug, Clone)]
pub struct Slab<'a> {
    dims: Vec<usize>,
    data: &'a [f32],
}

impl<'a> Slab<'a> {
    /// Wraps a slice under N declared dimensions.
    ///
    /// # Panics
    /// Panics if the product of dimensions does not equal the slice length.
    pub fn new(dims: Vec<usize>, data: &'a [f32]) -> Self {
        assert_eq!(
            dims.iter().product::<usize>(),
            data.len(),
            "dimensions {dims:?} are incompatible with {} elements",
            data.len()
        );
        Self { dims, data }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the sub-slab at `index` along the leading dimension.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn at(&self, index: usize) -> Slab<'a> {
        assert!(
            index < self.dims[0],
            "index {index} out of range for leading dimension {}",
            self.dims[0]
        );
        let stride = self.data.len() / self.dims[0];
        Slab {
            dims: self.dims[1..].to_vec(),
            data: &self.data[index * stride..(index + 1) * stride],
        }
    }

    /// Addresses this slab's storage as a `rows x cols` window.
    ///
    /// # Panics
    /// Panics if `rows * cols` does not equal the slab length.
    pub fn as_kernel(&self, rows: usize, cols: usize) -> Kernel<'a> {
        Kernel::new(rows, cols, self.data)
    }
}
