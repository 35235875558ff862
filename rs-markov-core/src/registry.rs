use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use log::{debug, info};

use crate::error::{ChainError, Result};
use crate::io::read_file;
use crate::model::chain::{BatchOutcome, MarkovChain};
use crate::store::{ChainStore, Environment, MemoryStore, PersistentStore};
use crate::text::{self, Granularity, MessageKind};

/// Opens the store backing a named chain.
pub trait StoreFactory {
	type Store: ChainStore;

	/// Opens (or creates) the store for the chain `name`.
	fn open_store(&self, name: &str) -> Result<Self::Store>;

	/// Names of chains that already exist in the backend.
	fn existing_names(&self) -> Result<Vec<String>>;
}

/// In-memory chains; nothing survives the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ephemeral;

impl StoreFactory for Ephemeral {
	type Store = MemoryStore;

	fn open_store(&self, _name: &str) -> Result<MemoryStore> {
		Ok(MemoryStore::new())
	}

	fn existing_names(&self) -> Result<Vec<String>> {
		Ok(Vec::new())
	}
}

impl StoreFactory for Environment {
	type Store = PersistentStore;

	fn open_store(&self, name: &str) -> Result<PersistentStore> {
		Environment::open_store(self, name)
	}

	fn existing_names(&self) -> Result<Vec<String>> {
		self.store_names()
	}
}

/// Named chains of one order, created on first reference.
///
/// Names are channel or user identifiers.
pub struct ChainRegistry<F: StoreFactory> {
	factory: F,
	order: usize,
	chains: HashMap<String, MarkovChain<F::Store>>,
}

impl<F: StoreFactory> ChainRegistry<F> {
	/// Creates an empty registry.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidOrder`] if `order < 2`.
	pub fn new(factory: F, order: usize) -> Result<Self> {
		if order < 2 {
			return Err(ChainError::InvalidOrder(order));
		}
		Ok(Self { factory, order, chains: HashMap::new() })
	}

	pub(crate) fn from_parts(factory: F, order: usize, chains: HashMap<String, MarkovChain<F::Store>>) -> Self {
		Self { factory, order, chains }
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn factory(&self) -> &F {
		&self.factory
	}

	/// Opens every chain already present in the backend.
	///
	/// Returns the number of chains opened.
	pub fn rehydrate(&mut self) -> Result<usize> {
		let mut opened = 0;
		for name in self.factory.existing_names()? {
			if let Entry::Vacant(slot) = self.chains.entry(name) {
				let store = self.factory.open_store(slot.key())?;
				slot.insert(MarkovChain::new(self.order, store)?);
				opened += 1;
			}
		}
		info!("rehydrated {opened} chains");
		Ok(opened)
	}

	/// The chain for `name`, created if it does not exist yet.
	pub fn chain(&mut self, name: &str) -> Result<&mut MarkovChain<F::Store>> {
		match self.chains.entry(name.to_owned()) {
			Entry::Occupied(slot) => Ok(slot.into_mut()),
			Entry::Vacant(slot) => {
				debug!("creating chain {name}");
				let store = self.factory.open_store(name)?;
				Ok(slot.insert(MarkovChain::new(self.order, store)?))
			}
		}
	}

	/// The chain for `name`, if it was ever created.
	pub fn get(&self, name: &str) -> Option<&MarkovChain<F::Store>> {
		self.chains.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.chains.contains_key(name)
	}

	/// Names of every open chain, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.chains.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &MarkovChain<F::Store>)> {
		self.chains.iter().map(|(name, chain)| (name.as_str(), chain))
	}

	pub(crate) fn into_parts(self) -> (F, usize, HashMap<String, MarkovChain<F::Store>>) {
		(self.factory, self.order, self.chains)
	}

	/// Trains every line of a text file into the chain `name`, in one batch.
	pub fn train_file<P: AsRef<Path>>(
		&mut self,
		name: &str,
		path: P,
		granularity: Granularity,
		kind: MessageKind,
	) -> Result<BatchOutcome> {
		let lines = read_file(path)?;
		let chain = self.chain(name)?;
		let order = chain.order();
		let outcome = chain.train_batch(lines.iter().map(|line| text::training_tokens(order, granularity, kind, line)))?;
		info!("trained {} lines into {name} ({} too short)", outcome.trained, outcome.skipped);
		Ok(outcome)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::intern_all;

	#[test]
	fn chains_are_created_lazily() {
		let mut registry = ChainRegistry::new(Ephemeral, 3).unwrap();
		assert!(registry.is_empty());
		registry.chain("#rust").unwrap().train(&["a", "b", "c"]).unwrap();
		registry.chain("alice").unwrap();
		registry.chain("#rust").unwrap();
		assert_eq!(registry.names(), ["#rust", "alice"]);
		assert_eq!(registry.get("#rust").unwrap().store().len(), 1);
		assert!(registry.get("bob").is_none());
	}

	#[test]
	fn rejects_bad_order() {
		assert!(ChainRegistry::new(Ephemeral, 0).is_err());
	}

	#[test]
	fn rehydrates_persistent_chains() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("chains.redb");
		{
			let env = Environment::open(&path).unwrap();
			let mut registry = ChainRegistry::new(env, 3).unwrap();
			registry.chain("#one").unwrap().train(&["a", "b", "c"]).unwrap();
			registry.chain("#two").unwrap().train(&["x", "y", "z"]).unwrap();
			// Never written: leaves no table behind.
			registry.chain("#empty").unwrap();
		}
		let env = Environment::open(&path).unwrap();
		let mut registry = ChainRegistry::new(env, 3).unwrap();
		assert_eq!(registry.rehydrate().unwrap(), 2);
		assert_eq!(registry.names(), ["#one", "#two"]);
		let chain = registry.get("#two").unwrap();
		assert!(chain.candidates(&intern_all(["x", "y"])).unwrap().is_some());
	}

	#[test]
	fn trains_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		std::fs::write(&path, "hello there\nhi\n\ngeneral kenobi\n").unwrap();

		let mut registry = ChainRegistry::new(Ephemeral, 3).unwrap();
		let outcome = registry.train_file("#log", &path, Granularity::Word, MessageKind::Say).unwrap();
		// "" + "v" + 0 words is too short for order 3
		assert_eq!(outcome, BatchOutcome { trained: 3, skipped: 1 });
	}
}
