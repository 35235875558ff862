//! Transition-table storage.
//!
//! [`ChainStore`] is the single interface the chain algorithms are written
//! against. Two implementations exist:
//! - [`MemoryStore`]: one table held in process memory
//! - [`PersistentStore`]: one named table inside a shared redb database
//!   opened through an [`Environment`]

use std::borrow::Cow;
use std::collections::HashMap;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::Result;
use crate::model::transitions::Transitions;
use crate::token::{StateKey, Token};

/// Canonical text encoding of persisted keys and values.
pub(crate) mod codec;

/// In-memory backend.
pub mod memory;

/// redb-backed backend.
pub mod persistent;

pub use memory::MemoryStore;
pub use persistent::{Environment, PersistentStore};

/// Storage of one chain's transition table.
///
/// `record` calls made between [`begin_batch`](ChainStore::begin_batch) and
/// [`commit_batch`](ChainStore::commit_batch) are applied as one unit; an
/// aborted or failed batch applies none of them. Outside a batch each
/// `record` is applied on its own.
///
/// A store has exactly one writer. Callers sharing a store between threads
/// must serialize writes themselves.
pub trait ChainStore {
	/// Increments the count of `next` under `state`, creating the entry if needed.
	fn record(&mut self, state: &[Token], next: &Token) -> Result<()>;

	/// Successors observed after `state`, or `None` for a terminal state.
	fn candidates(&self, state: &[Token]) -> Result<Option<Cow<'_, Transitions>>>;

	/// Every distinct recorded state, in no particular order.
	fn all_states(&self) -> Result<Vec<StateKey>>;

	/// Picks one recorded state uniformly at random.
	fn random_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<StateKey>> {
		Ok(self.all_states()?.choose(rng).cloned())
	}

	/// Starts buffering `record` calls.
	fn begin_batch(&mut self);

	/// Applies every buffered `record` call at once.
	///
	/// On failure nothing from the batch is applied and the batch is closed.
	fn commit_batch(&mut self) -> Result<()>;

	/// Drops every buffered `record` call.
	fn abort_batch(&mut self);

	fn in_batch(&self) -> bool;
}

/// Increments buffered by an open batch, grouped by state.
#[derive(Debug, Default, Clone)]
pub(crate) struct PendingBatch {
	increments: HashMap<StateKey, Transitions>,
	observations: usize,
}

impl PendingBatch {
	pub(crate) fn record(&mut self, state: &[Token], next: &Token) {
		match self.increments.get_mut(state) {
			Some(transitions) => transitions.add(next.clone()),
			None => {
				let mut transitions = Transitions::new();
				transitions.add(next.clone());
				self.increments.insert(state.to_vec(), transitions);
			}
		}
		self.observations += 1;
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.increments.is_empty()
	}

	/// Number of buffered `record` calls.
	pub(crate) fn observations(&self) -> usize {
		self.observations
	}

	pub(crate) fn into_entries(self) -> impl Iterator<Item = (StateKey, Transitions)> {
		self.increments.into_iter()
	}
}
