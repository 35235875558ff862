use std::collections::HashMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Successor frequencies observed after one state.
///
/// Conceptually, this is the set of outgoing edges of a node in the Markov
/// chain, each weighted by how many times it was observed during training.
///
/// Both storage backends hand out this type, so the weighted random choice
/// is the same routine whatever the physical representation.
///
/// ## Invariants
/// - Each recorded count is strictly positive
/// - Counts only ever grow
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transitions {
	/// Example: { "e" => 42, "a" => 3 }
	counts: HashMap<Token, u64>,
}

impl Transitions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one more occurrence of `next`.
	pub fn add(&mut self, next: Token) {
		self.add_count(next, 1);
	}

	/// Records `count` occurrences of `next` at once. A zero count is ignored.
	pub fn add_count(&mut self, next: Token, count: u64) {
		if count == 0 {
			return;
		}
		*self.counts.entry(next).or_insert(0) += count;
	}

	/// Number of times `next` was observed.
	pub fn count(&self, next: &str) -> u64 {
		self.counts.get(next).copied().unwrap_or(0)
	}

	/// Sum of all observation counts.
	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	/// Number of distinct successors.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Token, u64)> {
		self.counts.iter().map(|(token, count)| (token, *count))
	}

	/// Picks a successor with probability proportional to its count.
	///
	/// Returns `None` if nothing was ever recorded.
	pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Token> {
		let total = self.total();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		for (next, count) in &self.counts {
			if r < *count {
				return Some(next);
			}
			r -= count;
		}

		// Unreachable while counts sum to `total`
		None
	}

	/// Adds every count of `other` into this table.
	pub fn merge(&mut self, other: &Self) {
		for (next, count) in &other.counts {
			self.add_count(next.clone(), *count);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::intern;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn counts_accumulate() {
		let mut t = Transitions::new();
		t.add(intern("b"));
		t.add(intern("b"));
		t.add(intern("d"));
		assert_eq!(t.count("b"), 2);
		assert_eq!(t.count("d"), 1);
		assert_eq!(t.count("z"), 0);
		assert_eq!(t.total(), 3);
		assert_eq!(t.len(), 2);
	}

	#[test]
	fn choose_on_empty_is_none() {
		let mut rng = StdRng::seed_from_u64(7);
		assert!(Transitions::new().choose(&mut rng).is_none());
	}

	#[test]
	fn choose_follows_frequencies() {
		let mut t = Transitions::new();
		t.add_count(intern("heavy"), 9);
		t.add_count(intern("light"), 1);

		let mut rng = StdRng::seed_from_u64(42);
		let heavy = (0..10_000)
			.filter(|_| t.choose(&mut rng).map(Token::as_str) == Some("heavy"))
			.count();
		// Expected 9000; allow a generous margin.
		assert!((8_600..=9_400).contains(&heavy), "heavy picked {heavy} times");
	}

	#[test]
	fn merge_sums() {
		let mut a = Transitions::new();
		a.add(intern("x"));
		let mut b = Transitions::new();
		b.add_count(intern("x"), 2);
		b.add(intern("y"));
		a.merge(&b);
		assert_eq!(a.count("x"), 3);
		assert_eq!(a.count("y"), 1);
	}

	#[test]
	fn encodes_as_plain_mapping() {
		let mut t = Transitions::new();
		t.add_count(intern("c"), 2);
		assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"c":2}"#);
		let back: Transitions = serde_json::from_str(r#"{"c":2}"#).unwrap();
		assert_eq!(back, t);
	}
}
