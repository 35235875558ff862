use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::io::write_file_atomic;
use crate::model::chain::MarkovChain;
use crate::registry::{ChainRegistry, Ephemeral};
use crate::store::{ChainStore, MemoryStore};

/// Whole state of an in-memory chain collection, for restart continuity.
///
/// Serialized with `postcard`. Tokens are re-interned on load.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Snapshot {
	/// Chains by entity name
	pub chains: HashMap<String, MarkovChain<MemoryStore>>,
	/// Order shared by every chain
	pub order: usize,
	/// Channels joined when the snapshot was taken
	pub joined: Vec<String>,
	/// Generation length limit in use
	pub output_limit: usize,
}

impl Snapshot {
	/// Copies the current state of `registry`.
	///
	/// # Errors
	/// Returns [`ChainError::BatchInProgress`] if a chain has an open batch;
	/// its pending observations would not survive serialization.
	pub fn capture(registry: &ChainRegistry<Ephemeral>, joined: &[String], output_limit: usize) -> Result<Self> {
		ensure_committed(registry)?;
		Ok(Self {
			chains: registry.iter().map(|(name, chain)| (name.to_owned(), chain.clone())).collect(),
			order: registry.order(),
			joined: joined.to_vec(),
			output_limit,
		})
	}

	/// Rebuilds the registry held by this snapshot.
	///
	/// # Errors
	/// Returns an error if a chain's order differs from the snapshot order.
	pub fn into_registry(self) -> Result<ChainRegistry<Ephemeral>> {
		if let Some((name, chain)) = self.chains.iter().find(|(_, chain)| chain.order() != self.order) {
			return Err(ChainError::InvalidConfig(format!(
				"chain {name} has order {} but the snapshot order is {}",
				chain.order(),
				self.order
			)));
		}
		if self.order < 2 {
			return Err(ChainError::InvalidOrder(self.order));
		}
		Ok(ChainRegistry::from_parts(Ephemeral, self.order, self.chains))
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	/// Writes the snapshot to `path`, replacing any previous file atomically.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = self.to_bytes()?;
		write_file_atomic(&path, &bytes)?;
		info!("saved {} chains ({} bytes) to {}", self.chains.len(), bytes.len(), path.as_ref().display());
		Ok(())
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(&path)?;
		let snapshot = Self::from_bytes(&bytes)?;
		info!("loaded {} chains from {}", snapshot.chains.len(), path.as_ref().display());
		Ok(snapshot)
	}
}

impl ChainRegistry<Ephemeral> {
	/// Consumes the registry into a snapshot without copying the chains.
	///
	/// Fails like [`Snapshot::capture`] when a batch is open.
	pub fn into_snapshot(self, joined: Vec<String>, output_limit: usize) -> Result<Snapshot> {
		ensure_committed(&self)?;
		let (_, order, chains) = self.into_parts();
		Ok(Snapshot { chains, order, joined, output_limit })
	}
}

fn ensure_committed(registry: &ChainRegistry<Ephemeral>) -> Result<()> {
	match registry.iter().find(|(_, chain)| chain.store().in_batch()) {
		Some((name, _)) => Err(ChainError::BatchInProgress(name.to_owned())),
		None => Ok(()),
	}
}
