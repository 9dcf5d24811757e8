//! Receiver preferences: the equal-probability routing table of a sender.
//!
//! Every outbound link of a ramp or worker is interchangeable, so the map
//! keeps all probabilities equal at `1/n` and rebalances on every edit.
//! The stochastic pick is driven by an injectable zero-argument generator
//! producing values in `[0, 1)`; the default wraps a seeded [`SimRng`] so
//! runs are reproducible, and tests inject constant closures.

use crate::id::NodeHandle;
use crate::rng::SimRng;
use std::collections::BTreeMap;
use std::fmt;

/// Seed of the default generator. Fixed so that two factories built the
/// same way route the same way.
const DEFAULT_SEED: u64 = 0x6E65_7473_696D;

/// Errors that can occur when choosing a receiver.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("no receiver to choose from")]
    NoReceiver,
}

/// Zero-argument probability source for [`ReceiverPreferences::choose`].
pub type ProbabilityGenerator = Box<dyn FnMut() -> f64>;

/// A dynamic mapping from receiver handles to equal probabilities.
///
/// Invariants:
/// - all probabilities are equal and sum to 1.0 when the map is non-empty;
/// - iteration is in ascending `(kind, id)` handle order, never in any
///   order derived from memory addresses.
pub struct ReceiverPreferences {
    weights: BTreeMap<NodeHandle, f64>,
    generator: ProbabilityGenerator,
}

impl ReceiverPreferences {
    /// Preferences with the default deterministic uniform generator.
    pub fn new() -> Self {
        Self::from_seed(DEFAULT_SEED)
    }

    /// Preferences whose generator is a [`SimRng`] with the given seed.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        Self::with_generator(move || rng.next_f64())
    }

    /// Preferences with a caller-supplied generator. The generator must
    /// produce values in `[0, 1)`.
    pub fn with_generator(generator: impl FnMut() -> f64 + 'static) -> Self {
        Self {
            weights: BTreeMap::new(),
            generator: Box::new(generator),
        }
    }

    /// Replace the probability generator, keeping the receiver set.
    pub fn set_generator(&mut self, generator: impl FnMut() -> f64 + 'static) {
        self.generator = Box::new(generator);
    }

    /// Insert a receiver if absent, then rebalance all probabilities to `1/n`.
    pub fn add(&mut self, receiver: NodeHandle) {
        self.weights.entry(receiver).or_insert(0.0);
        self.rebalance();
    }

    /// Remove a receiver if present, then rebalance. Removing the last
    /// receiver leaves the set empty.
    pub fn remove(&mut self, receiver: &NodeHandle) {
        if self.weights.remove(receiver).is_some() {
            self.rebalance();
        }
    }

    pub fn contains(&self, receiver: &NodeHandle) -> bool {
        self.weights.contains_key(receiver)
    }

    /// Read-only view of the mapping, in deterministic handle order.
    pub fn preferences(&self) -> &BTreeMap<NodeHandle, f64> {
        &self.weights
    }

    /// Iterate the receiver handles in deterministic order.
    pub fn receivers(&self) -> impl Iterator<Item = &NodeHandle> {
        self.weights.keys()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Draw from the generator and return the first receiver whose running
    /// probability total strictly exceeds the drawn value. With equal
    /// probabilities this is the receiver at index `⌊r·n⌋`.
    pub fn choose(&mut self) -> Result<NodeHandle, RouteError> {
        let last = *self.weights.keys().next_back().ok_or(RouteError::NoReceiver)?;
        let r = (self.generator)();

        let mut total = 0.0;
        for (&handle, &weight) in &self.weights {
            total += weight;
            if total > r {
                return Ok(handle);
            }
        }
        // Rounding can leave the accumulated total a hair below 1.0 for
        // r close to 1; the walk then falls through to the last receiver.
        Ok(last)
    }

    fn rebalance(&mut self) {
        let n = self.weights.len();
        if n == 0 {
            return;
        }
        let share = 1.0 / n as f64;
        for weight in self.weights.values_mut() {
            *weight = share;
        }
    }
}

impl Default for ReceiverPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReceiverPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverPreferences")
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}
