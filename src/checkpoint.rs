//! Checkpoint serialization of trainable parameters.
//!
//! # Format
//!
//! Each layer with trainable parameters writes its buffers in a fixed,
//! layer-specific order (e.g. weights then bias; the LSTM writes four weight
//! buffers then four bias buffers) as whitespace-separated text:
//!
//! ```text
//! rows cols v0 v1 v2 ...
//! ```
//!
//! with `rows * cols` values in row-major order. The format is positional
//! (no type tags), so the layer order must match exactly between save and
//! load. Loading reconstructs each buffer's shape from the stored
//! dimensions before reading values.
//!
//! # Validation
//!
//! Parsed tensors are untrusted input: the stored dimension pair is gated
//! through `briny`'s [`Validate`]/[`TrustedData`] before a live [`Mat`] is
//! constructed, so a truncated or hand-mangled checkpoint surfaces an error
//! instead of corrupt state.

use crate::mat::Mat;
use briny::prelude::*;
use std::error::Error;
use std::io::{BufRead, Write};

/// A parsed-but-untrusted checkpoint tensor.
struct RawMat {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Validate for RawMat {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.rows * self.cols != self.data.len() {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Writes one matrix in checkpoint text form.
///
/// # Errors
/// Returns an error if the underlying writer fails.
pub fn write_mat(out: &mut dyn Write, mat: &Mat) -> std::io::Result<()> {
    write!(out, "{} {} ", mat.rows(), mat.cols())?;
    for &v in &mat.data {
        write!(out, "{v} ")?;
    }
    Ok(())
}

/// A whitespace-token reader over a checkpoint stream.
///
/// Layers pull their parameter buffers from it positionally during load.
pub struct CheckpointReader<'a> {
    src: &'a mut dyn BufRead,
}

impl<'a> CheckpointReader<'a> {
    pub fn new(src: &'a mut dyn BufRead) -> Self {
        Self { src }
    }

    fn next_token(&mut self) -> Result<String, Box<dyn Error>> {
        let mut tok = String::new();
        loop {
            let available = self.src.fill_buf()?;
            if available.is_empty() {
                break;
            }
            let mut consumed = 0;
            let mut done = false;
            for &byte in available {
                consumed += 1;
                if byte.is_ascii_whitespace() {
                    if tok.is_empty() {
                        continue;
                    }
                    done = true;
                    break;
                }
                tok.push(byte as char);
            }
            self.src.consume(consumed);
            if done {
                break;
            }
        }
        if tok.is_empty() {
            return Err("unexpected end of checkpoint".into());
        }
        Ok(tok)
    }

    fn read_usize(&mut self) -> Result<usize, Box<dyn Error>> {
        Ok(self.next_token()?.parse::<usize>()?)
    }

    fn read_f32(&mut self) -> Result<f32, Box<dyn Error>> {
        Ok(self.next_token()?.parse::<f32>()?)
    }

    /// Reads one matrix: two dimensions, then `rows * cols` values.
    ///
    /// # Errors
    /// Fails on a truncated stream, a malformed token, or a tensor that
    /// does not validate against its declared shape.
    pub fn read_mat(&mut self) -> Result<Mat, Box<dyn Error>> {
        let rows = self.read_usize()?;
        let cols = self.read_usize()?;
        let mut data = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            data.push(self.read_f32()?);
        }

        let raw = RawMat { rows, cols, data };
        let trusted = TrustedData::new(raw)?;
        let inner = trusted.into_inner();
        Ok(Mat::new(inner.rows, inner.cols, inner.data))
    }
}
