use std::borrow::Cow;

use rand::Rng;
use rand::rngs::ThreadRng;

use serde::{Deserialize, Serialize};

use super::generation::Generation;
use super::transitions::Transitions;
use crate::error::{ChainError, Result};
use crate::store::ChainStore;
use crate::token::{self, StateKey, Token};

/// Outcome of [`MarkovChain::train_batch`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
	/// Sequences trained into the chain
	pub trained: usize,
	/// Sequences shorter than the chain order, ignored
	pub skipped: usize,
}

/// A Markov chain of order `k` over a storage backend.
///
/// A state is `k-1` consecutive tokens; the `k`-th token is its successor.
/// The order is fixed at construction.
///
/// # Invariants
/// - `order` is always >= 2
/// - Every state recorded or looked up has exactly `order - 1` tokens
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MarkovChain<S> {
	/// Window length `k`
	order: usize,

	store: S,
}

impl<S: ChainStore> MarkovChain<S> {
	/// Creates a chain of order `order` backed by `store`.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidOrder`] if `order < 2`.
	pub fn new(order: usize, store: S) -> Result<Self> {
		if order < 2 {
			return Err(ChainError::InvalidOrder(order));
		}
		Ok(Self { order, store })
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of tokens in a state (`order - 1`).
	pub fn state_len(&self) -> usize {
		self.order - 1
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	/// Trains the chain on a sequence of raw tokens.
	///
	/// Tokens are interned first, then a window of `order` tokens slides over
	/// the sequence with stride 1. Returns the number of observations recorded
	/// (`len - order + 1`).
	///
	/// # Errors
	/// [`ChainError::InsufficientData`] if the sequence is shorter than the
	/// order. Callers usually skip such input.
	pub fn train<T: AsRef<str>>(&mut self, sequence: &[T]) -> Result<usize> {
		self.check_trainable(sequence.len())?;
		let tokens = token::intern_all(sequence);
		self.train_tokens(&tokens)
	}

	/// Same as [`train`](Self::train) for already interned tokens.
	pub fn train_tokens(&mut self, tokens: &[Token]) -> Result<usize> {
		self.check_trainable(tokens.len())?;
		let mut observations = 0;
		for window in tokens.windows(self.order) {
			let (state, next) = window.split_at(self.order - 1);
			self.store.record(state, &next[0])?;
			observations += 1;
		}
		Ok(observations)
	}

	/// Trains every sequence inside one storage batch.
	///
	/// Sequences that are too short are counted and skipped. Any other error
	/// aborts the batch, so none of its observations are applied.
	pub fn train_batch<I>(&mut self, sequences: I) -> Result<BatchOutcome>
	where
		I: IntoIterator,
		I::Item: AsRef<[Token]>,
	{
		let mut outcome = BatchOutcome::default();
		self.store.begin_batch();
		for sequence in sequences {
			match self.train_tokens(sequence.as_ref()) {
				Ok(_) => outcome.trained += 1,
				Err(e) if e.is_recoverable() => outcome.skipped += 1,
				Err(e) => {
					self.store.abort_batch();
					return Err(e);
				}
			}
		}
		self.store.commit_batch()?;
		Ok(outcome)
	}

	/// Successors observed after `state`, or `None` for a terminal state.
	pub fn candidates(&self, state: &[Token]) -> Result<Option<Cow<'_, Transitions>>> {
		self.check_state(state.len())?;
		self.store.candidates(state)
	}

	/// Generates at most `max_len` tokens using the thread-local RNG.
	///
	/// See [`generate_with`](Self::generate_with).
	pub fn generate(&self, max_len: usize, initial: Option<StateKey>) -> Result<Generation<'_, S, ThreadRng>> {
		self.generate_with(max_len, initial, rand::rng())
	}

	/// Starts a random walk of at most `max_len` tokens.
	///
	/// The initial state (random when `None`) is emitted first, then one
	/// frequency-weighted successor per step until `max_len` tokens were
	/// produced or a terminal state is reached.
	///
	/// # Errors
	/// - [`ChainError::InsufficientLength`] if `max_len < order`
	/// - [`ChainError::InvalidState`] if `initial` is not `order - 1` tokens long
	/// - [`ChainError::EmptyChain`] if no state exists to start from
	pub fn generate_with<R: Rng>(
		&self,
		max_len: usize,
		initial: Option<StateKey>,
		mut rng: R,
	) -> Result<Generation<'_, S, R>> {
		if max_len < self.order {
			return Err(ChainError::InsufficientLength { needed: self.order, requested: max_len });
		}
		let state = match initial {
			Some(state) => {
				self.check_state(state.len())?;
				state
			}
			None => self.store.random_state(&mut rng)?.ok_or(ChainError::EmptyChain)?,
		};
		let remaining = max_len - state.len();
		Ok(Generation::new(&self.store, state, remaining, rng))
	}

	fn check_trainable(&self, len: usize) -> Result<()> {
		if len < self.order {
			return Err(ChainError::InsufficientData { needed: self.order, got: len });
		}
		Ok(())
	}

	fn check_state(&self, len: usize) -> Result<()> {
		if len != self.order - 1 {
			return Err(ChainError::InvalidState { expected: self.order - 1, got: len });
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryStore;
	use crate::token::{intern, intern_all};
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn trained_abc() -> MarkovChain<MemoryStore> {
		let mut chain = MarkovChain::new(3, MemoryStore::new()).unwrap();
		assert_eq!(chain.train(&["a", "b", "c", "b", "c", "d"]).unwrap(), 4);
		chain
	}

	#[test]
	fn rejects_order_below_two() {
		assert!(matches!(MarkovChain::new(1, MemoryStore::new()), Err(ChainError::InvalidOrder(1))));
		assert!(MarkovChain::new(2, MemoryStore::new()).is_ok());
	}

	#[test]
	fn builds_expected_table() {
		let chain = trained_abc();
		let ab = chain.candidates(&intern_all(["a", "b"])).unwrap().unwrap();
		assert_eq!(ab.count("c"), 1);
		assert_eq!(ab.len(), 1);

		let bc = chain.candidates(&intern_all(["b", "c"])).unwrap().unwrap();
		assert_eq!(bc.count("b"), 1);
		assert_eq!(bc.count("d"), 1);

		let cb = chain.candidates(&intern_all(["c", "b"])).unwrap().unwrap();
		assert_eq!(cb.count("c"), 1);

		assert!(chain.candidates(&intern_all(["c", "d"])).unwrap().is_none());
		assert_eq!(chain.store().len(), 3);
	}

	#[test]
	fn short_input_is_insufficient() {
		let mut chain = MarkovChain::new(3, MemoryStore::new()).unwrap();
		let err = chain.train(&["a", "b"]).unwrap_err();
		assert!(matches!(err, ChainError::InsufficientData { needed: 3, got: 2 }));
		assert!(chain.store().is_empty());
	}

	#[test]
	fn observations_match_window_count() {
		let mut chain = MarkovChain::new(4, MemoryStore::new()).unwrap();
		let text: Vec<String> = "the cat sat on the mat and the cat ran".split(' ').map(str::to_owned).collect();
		let recorded = chain.train(&text).unwrap();
		assert_eq!(recorded, text.len() - 4 + 1);
		assert_eq!(chain.store().observations(), recorded as u64);

		chain.train(&text).unwrap();
		assert_eq!(chain.store().observations(), 2 * recorded as u64);
		let the_cat = chain.candidates(&intern_all(["the", "cat", "sat"])).unwrap().unwrap();
		assert_eq!(the_cat.count("on"), 2);
	}

	#[test]
	fn generate_requires_length() {
		let chain = trained_abc();
		let err = chain.generate(2, None).err().unwrap();
		assert!(matches!(err, ChainError::InsufficientLength { needed: 3, requested: 2 }));
	}

	#[test]
	fn generate_rejects_wrong_state_length() {
		let chain = trained_abc();
		let err = chain.generate(6, Some(intern_all(["a"]))).err().unwrap();
		assert!(matches!(err, ChainError::InvalidState { expected: 2, got: 1 }));
	}

	#[test]
	fn generate_on_empty_chain() {
		let chain = MarkovChain::new(3, MemoryStore::new()).unwrap();
		assert!(matches!(chain.generate(5, None).err(), Some(ChainError::EmptyChain)));
	}

	#[test]
	fn generation_follows_legal_successors() {
		let chain = trained_abc();
		for seed in 0..50 {
			let rng = StdRng::seed_from_u64(seed);
			let out: Vec<Token> = chain
				.generate_with(6, Some(intern_all(["a", "b"])), rng)
				.unwrap()
				.collect::<Result<_>>()
				.unwrap();
			assert_eq!(&out[..3], &intern_all(["a", "b", "c"])[..]);
			assert!(out.len() >= 3 && out.len() <= 6);
			for window in out.windows(3) {
				let successors = chain.candidates(&window[..2]).unwrap().unwrap();
				assert!(successors.count(window[2].as_str()) > 0);
			}
			if out.len() < 6 {
				let last = &out[out.len() - 2..];
				assert!(chain.candidates(last).unwrap().is_none());
			}
		}
	}

	#[test]
	fn random_start_respects_bounds() {
		let chain = trained_abc();
		for seed in 0..50 {
			let out: Vec<Token> = chain
				.generate_with(5, None, StdRng::seed_from_u64(seed))
				.unwrap()
				.collect::<Result<_>>()
				.unwrap();
			assert!(out.len() >= 3, "{out:?}");
			assert!(out.len() <= 5, "{out:?}");
		}
	}

	#[test]
	fn batch_skips_short_sequences() {
		let mut chain = MarkovChain::new(3, MemoryStore::new()).unwrap();
		let sequences = vec![intern_all(["a", "b", "c"]), intern_all(["x"]), intern_all(["a", "b", "d"])];
		let outcome = chain.train_batch(&sequences).unwrap();
		assert_eq!(outcome, BatchOutcome { trained: 2, skipped: 1 });
		let ab = chain.candidates(&[intern("a"), intern("b")]).unwrap().unwrap();
		assert_eq!(ab.total(), 2);
		assert!(!chain.store().in_batch());
	}
}
