use std::borrow::Cow;
use std::collections::HashMap;

use rand::Rng;
use rand::seq::IteratorRandom;

use serde::{Deserialize, Serialize};

use super::{ChainStore, PendingBatch};
use crate::error::Result;
use crate::model::transitions::Transitions;
use crate::token::{StateKey, Token};

/// Transition table held entirely in process memory.
///
/// Lost on exit unless captured in a [`Snapshot`](crate::snapshot::Snapshot).
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemoryStore {
	/// Mapping from a state to the successors observed after it
	table: HashMap<StateKey, Transitions>,

	#[serde(skip)]
	pending: Option<PendingBatch>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of distinct recorded states.
	pub fn len(&self) -> usize {
		self.table.len()
	}

	pub fn is_empty(&self) -> bool {
		self.table.is_empty()
	}

	/// Total number of recorded observations across all states.
	pub fn observations(&self) -> u64 {
		self.table.values().map(Transitions::total).sum()
	}
}

impl ChainStore for MemoryStore {
	fn record(&mut self, state: &[Token], next: &Token) -> Result<()> {
		if let Some(batch) = self.pending.as_mut() {
			batch.record(state, next);
			return Ok(());
		}
		match self.table.get_mut(state) {
			Some(transitions) => transitions.add(next.clone()),
			None => {
				let mut transitions = Transitions::new();
				transitions.add(next.clone());
				self.table.insert(state.to_vec(), transitions);
			}
		}
		Ok(())
	}

	fn candidates(&self, state: &[Token]) -> Result<Option<Cow<'_, Transitions>>> {
		Ok(self
			.table
			.get(state)
			.filter(|transitions| !transitions.is_empty())
			.map(Cow::Borrowed))
	}

	fn all_states(&self) -> Result<Vec<StateKey>> {
		Ok(self.table.keys().cloned().collect())
	}

	fn random_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<StateKey>> {
		Ok(self.table.keys().choose(rng).cloned())
	}

	fn begin_batch(&mut self) {
		self.pending.get_or_insert_with(PendingBatch::default);
	}

	fn commit_batch(&mut self) -> Result<()> {
		let Some(batch) = self.pending.take() else {
			return Ok(());
		};
		for (state, increments) in batch.into_entries() {
			self.table.entry(state).or_default().merge(&increments);
		}
		Ok(())
	}

	fn abort_batch(&mut self) {
		self.pending = None;
	}

	fn in_batch(&self) -> bool {
		self.pending.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::{intern, intern_all};
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn record_then_lookup() {
		let mut store = MemoryStore::new();
		let bc = intern_all(["b", "c"]);
		store.record(&bc, &intern("b")).unwrap();
		store.record(&bc, &intern("d")).unwrap();
		store.record(&bc, &intern("d")).unwrap();

		let candidates = store.candidates(&bc).unwrap().unwrap();
		assert_eq!(candidates.count("b"), 1);
		assert_eq!(candidates.count("d"), 2);
		assert!(store.candidates(&intern_all(["x", "y"])).unwrap().is_none());
		assert_eq!(store.observations(), 3);
	}

	#[test]
	fn batch_applies_on_commit_only() {
		let mut store = MemoryStore::new();
		let ab = intern_all(["a", "b"]);
		store.begin_batch();
		store.record(&ab, &intern("c")).unwrap();
		assert!(store.in_batch());
		assert!(store.candidates(&ab).unwrap().is_none());
		store.commit_batch().unwrap();
		assert!(!store.in_batch());
		assert_eq!(store.candidates(&ab).unwrap().unwrap().count("c"), 1);
	}

	#[test]
	fn aborted_batch_leaves_no_trace() {
		let mut store = MemoryStore::new();
		store.begin_batch();
		store.record(&intern_all(["a", "b"]), &intern("c")).unwrap();
		store.abort_batch();
		assert!(store.is_empty());
	}

	#[test]
	fn random_state_comes_from_table() {
		let mut store = MemoryStore::new();
		let mut rng = StdRng::seed_from_u64(1);
		assert!(store.random_state(&mut rng).unwrap().is_none());

		store.record(&intern_all(["a", "b"]), &intern("c")).unwrap();
		store.record(&intern_all(["b", "c"]), &intern("d")).unwrap();
		let states = store.all_states().unwrap();
		for _ in 0..20 {
			let picked = store.random_state(&mut rng).unwrap().unwrap();
			assert!(states.contains(&picked));
		}
	}
}
