use std::iter::FusedIterator;

use rand::Rng;

use crate::error::Result;
use crate::store::ChainStore;
use crate::token::{StateKey, Token};

/// Lazy random walk over a chain.
///
/// Yields the initial state's tokens, then one successor per step. Ends
/// after the requested number of tokens, on a terminal state, or right after
/// yielding a storage error. Once exhausted it stays exhausted.
pub struct Generation<'a, S, R> {
	store: &'a S,
	/// Current window of `order - 1` tokens
	state: StateKey,
	/// Initial tokens not yet yielded
	seed: std::vec::IntoIter<Token>,
	/// Successors still allowed
	remaining: usize,
	rng: R,
	done: bool,
}

impl<'a, S: ChainStore, R: Rng> Generation<'a, S, R> {
	pub(crate) fn new(store: &'a S, state: StateKey, remaining: usize, rng: R) -> Self {
		Self {
			store,
			seed: state.clone().into_iter(),
			state,
			remaining,
			rng,
			done: false,
		}
	}

	fn step(&mut self) -> Result<Option<Token>> {
		if self.remaining == 0 {
			return Ok(None);
		}
		let store = self.store;
		let Some(candidates) = store.candidates(&self.state)? else {
			return Ok(None);
		};
		let Some(next) = candidates.choose(&mut self.rng).cloned() else {
			return Ok(None);
		};
		self.state.remove(0);
		self.state.push(next.clone());
		self.remaining -= 1;
		Ok(Some(next))
	}
}

impl<S: ChainStore, R: Rng> Iterator for Generation<'_, S, R> {
	type Item = Result<Token>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		if let Some(token) = self.seed.next() {
			return Some(Ok(token));
		}
		match self.step() {
			Ok(Some(token)) => Some(Ok(token)),
			Ok(None) => {
				self.done = true;
				None
			}
			Err(e) => {
				self.done = true;
				Some(Err(e))
			}
		}
	}
}

impl<S: ChainStore, R: Rng> FusedIterator for Generation<'_, S, R> {}

#[cfg(test)]
mod tests {
	use crate::model::chain::MarkovChain;
	use crate::store::{ChainStore, MemoryStore};
	use crate::token::intern_all;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn terminal_seed_yields_only_the_seed() {
		let mut chain = MarkovChain::new(3, MemoryStore::new()).unwrap();
		chain.train(&["a", "b", "c"]).unwrap();
		let mut walk = chain
			.generate_with(10, Some(intern_all(["x", "y"])), StdRng::seed_from_u64(0))
			.unwrap();
		assert_eq!(walk.next().unwrap().unwrap().as_str(), "x");
		assert_eq!(walk.next().unwrap().unwrap().as_str(), "y");
		assert!(walk.next().is_none());
		assert!(walk.next().is_none());
	}

	#[test]
	fn stops_at_max_len_on_cycles() {
		let mut chain = MarkovChain::new(2, MemoryStore::new()).unwrap();
		chain.train(&["a", "a", "a"]).unwrap();
		let out: Vec<_> = chain
			.generate_with(7, Some(intern_all(["a"])), StdRng::seed_from_u64(3))
			.unwrap()
			.collect();
		assert_eq!(out.len(), 7);
	}

	#[test]
	fn walk_is_lazy() {
		let mut chain = MarkovChain::new(2, MemoryStore::new()).unwrap();
		chain.train(&["a", "a"]).unwrap();
		let walk = chain
			.generate_with(1_000_000, Some(intern_all(["a"])), StdRng::seed_from_u64(3))
			.unwrap();
		assert_eq!(walk.take(3).count(), 3);
		assert!(!chain.store().in_batch());
	}
}
