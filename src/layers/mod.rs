//! The layer zoo: a capability trait plus every concrete layer.
//!
//! A layer moves through a fixed lifecycle: *constructed* (shapes fixed,
//! parameters uninitialized) -> *randomized* -> repeating
//! {forward -> backward -> gradient accumulated} per minibatch sample ->
//! *updated* (the optimizer applies the accumulated gradient and the
//! accumulators reset to zero) -> forward-ready again.
//!
//! Stateful layers cache the forward input needed by the matching backward
//! call. Backward without a matching forward is a state-misuse error and
//! panics. A repeated forward simply replaces the cache: inference loops
//! call forward many times with no backward in between.

mod activation;
mod conv;
mod dense;
mod flatten;
mod lstm;
mod pool;
mod rnn;

pub use activation::{Activation, ActivationLayer, Softmax};
pub use conv::Conv;
pub use dense::Dense;
pub use flatten::Flatten;
pub use lstm::Lstm;
pub use pool::{PoolKind, Pooling};
pub use rnn::Rnn;

use crate::checkpoint::CheckpointReader;
use crate::mat::Mat;
use crate::optim::Optimizer;
use rand::rngs::StdRng;
use std::error::Error;
use std::io::Write;

/// The polymorphic layer interface the network composes.
pub trait Layer {
    /// Computes this layer's activation for one sample, caching whatever
    /// the matching [`Layer::backward`] call needs.
    fn forward(&mut self, input: Mat) -> Mat;

    /// Consumes the forward cache, accumulates parameter gradients into the
    /// layer's nabla buffers, and returns the gradient for the previous
    /// layer.
    ///
    /// # Panics
    /// Panics if no forward call is in flight (state misuse).
    fn backward(&mut self, delta: Mat) -> Mat;

    /// Samples fresh parameters from the layer's initializer. Layers with
    /// no trainable parameters do nothing.
    fn randomize(&mut self, _rng: &mut StdRng) {}

    /// Applies the accumulated gradients through `optimizer`, then zeroes
    /// the accumulators. `samples` is the number of backward calls
    /// accumulated since the previous update.
    fn apply_update(&mut self, _optimizer: &dyn Optimizer, _samples: usize) {}

    /// Writes trainable parameters in this layer's fixed order.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    fn save(&self, _out: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }

    /// Reads trainable parameters in the same order [`Layer::save`] wrote
    /// them, reconstructing shapes from the stored dimensions.
    ///
    /// # Errors
    /// Returns an error on a truncated or malformed checkpoint.
    fn load(&mut self, _src: &mut CheckpointReader<'_>) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    /// Clears any recurrent state carried across forward calls. A no-op for
    /// stateless layers.
    fn reset_state(&mut self) {}
}
