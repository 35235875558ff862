//! Markov chain engine.
//!
//! - Fixed-order chains bound to a storage backend (`MarkovChain`)
//! - Lazy, bounded random walks over a chain (`Generation`)
//! - Frequency-weighted successor tables (`Transitions`)

/// A chain of fixed order `k` over any [`ChainStore`](crate::store::ChainStore).
///
/// Handles training by sliding window and random-walk generation.
pub mod chain;

/// Iterator produced by [`MarkovChain::generate`](chain::MarkovChain::generate).
pub mod generation;

/// Successor counts for one state, with weighted random sampling.
pub mod transitions;
