//! nablanet: a from-scratch neural-network training engine in Rust.
//!
//! A mutable 2D buffer with zero-copy reshaping views, a polymorphic layer
//! graph with hand-derived gradients, and a minibatch SGD training loop.
//! No automatic differentiation, no GPU, no black boxes.
//!
//! # Features
//!
//! - Row-major `Mat` buffers plus aliasing `Kernel`/`Slab` views for
//!   addressing sub-blocks and reinterpreting rank without copying.
//! - Dense, convolution (im2col-based, with an opt-in rayon-parallel
//!   variant), pooling, flatten, activation, softmax, RNN and LSTM layers,
//!   each implementing the same forward/backward/accumulate/update
//!   lifecycle.
//! - Seedable parameter initialization (uniform, normal, Xavier, Kaiming)
//!   and dataset shuffling for reproducible runs.
//! - Positional whitespace-text checkpoints with validated loading.
//!
//! # Modules
//!
//! - [`mat`] — the buffer/view engine.
//! - [`math`] — elementwise activations and softmax.
//! - [`spatial`] — im2col/col2im, direct correlation, pooling.
//! - [`init`] — parameter-initialization strategies.
//! - [`layers`] — the layer trait and every concrete layer.
//! - [`network`] — layer composition, training loop, metrics.
//! - [`optim`] — the update protocol and SGD.
//! - [`checkpoint`] — parameter persistence.
//! - [`approx`] — float-comparison helpers for tests.
//!
//! # Example
//!
//! ```rust
//! use nablanet::layers::{ActivationLayer, Dense};
//! use nablanet::network::Network;
//!
//! let mut net = Network::new(vec![
//!     Box::new(Dense::new(2, 8)),
//!     Box::new(ActivationLayer::sigmoid()),
//!     Box::new(Dense::new(8, 2)),
//!     Box::new(ActivationLayer::sigmoid()),
//! ]);
//! net.init(7);
//! ```

pub mod approx;
pub mod checkpoint;
pub mod init;
pub mod layers;
pub mod mat;
pub mod math;
pub mod network;
pub mod optim;
pub mod spatial;
