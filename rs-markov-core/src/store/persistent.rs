use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle, WriteTransaction};

use super::{ChainStore, PendingBatch, codec};
use crate::error::{ChainError, Result};
use crate::model::transitions::Transitions;
use crate::token::{StateKey, Token};

/// Table layout shared by every chain: encoded state -> encoded successor counts.
type ChainTable<'a> = TableDefinition<'a, &'static str, &'static str>;

/// One redb database file holding a named table per chain.
///
/// Cloning is cheap; clones share the same open database.
#[derive(Clone)]
pub struct Environment {
	db: Arc<Database>,
	path: PathBuf,
}

impl Environment {
	/// Opens the database at `path`, creating it if it does not exist.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let db = Database::create(&path)?;
		info!("opened chain environment at {}", path.display());
		Ok(Self { db: Arc::new(db), path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Binds a store to the table `name`. The table itself is created on first write.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidConfig`] if `name` is empty; redb has no
	/// table without a name.
	pub fn open_store(&self, name: &str) -> Result<PersistentStore> {
		if name.is_empty() {
			return Err(ChainError::InvalidConfig("chain name must not be empty".to_owned()));
		}
		Ok(PersistentStore {
			db: Arc::clone(&self.db),
			name: name.to_owned(),
			pending: None,
		})
	}

	/// Names of every table present in the database.
	pub fn store_names(&self) -> Result<Vec<String>> {
		let txn = self.db.begin_read()?;
		let names = txn.list_tables()?.map(|handle| handle.name().to_owned()).collect();
		Ok(names)
	}
}

/// Transition table stored in one named table of an [`Environment`].
///
/// Each table must have a single writer: two stores bound to the same name
/// must not write concurrently.
pub struct PersistentStore {
	db: Arc<Database>,
	name: String,
	pending: Option<PendingBatch>,
}

impl fmt::Debug for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Environment").field("path", &self.path).finish()
	}
}

impl fmt::Debug for PersistentStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PersistentStore")
			.field("name", &self.name)
			.field("in_batch", &self.pending.is_some())
			.finish()
	}
}

impl PersistentStore {
	pub fn name(&self) -> &str {
		&self.name
	}

	fn table(&self) -> ChainTable<'_> {
		TableDefinition::new(&self.name)
	}

	/// Applies `batch` in one write transaction, aborting it on any failure.
	fn apply(&self, batch: PendingBatch) -> Result<()> {
		if batch.is_empty() {
			return Ok(());
		}
		let observations = batch.observations();
		let txn = self.db.begin_write()?;
		match self.write_increments(&txn, batch) {
			Ok(keys) => {
				txn.commit()?;
				debug!("committed {observations} observations over {keys} states to {}", self.name);
				Ok(())
			}
			Err(e) => {
				if let Err(abort) = txn.abort() {
					warn!("failed to abort transaction on {}: {abort}", self.name);
				}
				Err(e)
			}
		}
	}

	/// Read-modify-write of every touched key. Returns the number of keys written.
	fn write_increments(&self, txn: &WriteTransaction, batch: PendingBatch) -> Result<usize> {
		let mut table = txn.open_table(self.table())?;
		let mut keys = 0;
		for (state, increments) in batch.into_entries() {
			let key = codec::encode_key(&state)?;
			let existing = table.get(key.as_str())?.map(|raw| raw.value().to_owned());
			// Absent keys read as an empty mapping; a value we cannot decode
			// was written by us and means the table is damaged.
			let mut counts = match existing {
				Some(raw) => codec::decode_value(&raw).map_err(|e| ChainError::CorruptEntry {
					store: self.name.clone(),
					key: key.clone(),
					reason: e.to_string(),
				})?,
				None => Transitions::new(),
			};
			counts.merge(&increments);
			let value = codec::encode_value(&counts)?;
			table.insert(key.as_str(), value.as_str())?;
			keys += 1;
		}
		Ok(keys)
	}
}

#[cfg(test)]
impl PersistentStore {
	/// Writes `value` under `state` as is, bypassing the codec.
	pub(crate) fn put_raw(&self, state: &[Token], value: &str) {
		let key = codec::encode_key(state).unwrap();
		let txn = self.db.begin_write().unwrap();
		{
			let mut table = txn.open_table(self.table()).unwrap();
			table.insert(key.as_str(), value).unwrap();
		}
		txn.commit().unwrap();
	}
}

impl ChainStore for PersistentStore {
	fn record(&mut self, state: &[Token], next: &Token) -> Result<()> {
		if let Some(batch) = self.pending.as_mut() {
			batch.record(state, next);
			return Ok(());
		}
		let mut single = PendingBatch::default();
		single.record(state, next);
		self.apply(single)
	}

	fn candidates(&self, state: &[Token]) -> Result<Option<Cow<'_, Transitions>>> {
		let key = codec::encode_key(state)?;
		let txn = self.db.begin_read()?;
		let table = match txn.open_table(self.table()) {
			Ok(table) => table,
			Err(TableError::TableDoesNotExist(_)) => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let Some(raw) = table.get(key.as_str())? else {
			return Ok(None);
		};
		match codec::decode_value(raw.value()) {
			Ok(transitions) if transitions.is_empty() => Ok(None),
			Ok(transitions) => Ok(Some(Cow::Owned(transitions))),
			Err(e) => {
				warn!("ignoring undecodable value for {key} in {}: {e}", self.name);
				Ok(None)
			}
		}
	}

	fn all_states(&self) -> Result<Vec<StateKey>> {
		let txn = self.db.begin_read()?;
		let table = match txn.open_table(self.table()) {
			Ok(table) => table,
			Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};
		let mut states = Vec::new();
		for entry in table.iter()? {
			let (key, _) = entry?;
			let raw = key.value();
			let state = codec::decode_key(raw).map_err(|e| ChainError::CorruptEntry {
				store: self.name.clone(),
				key: raw.to_owned(),
				reason: e.to_string(),
			})?;
			states.push(state);
		}
		Ok(states)
	}

	fn begin_batch(&mut self) {
		self.pending.get_or_insert_with(PendingBatch::default);
	}

	fn commit_batch(&mut self) -> Result<()> {
		match self.pending.take() {
			Some(batch) => self.apply(batch),
			None => Ok(()),
		}
	}

	fn abort_batch(&mut self) {
		self.pending = None;
	}

	fn in_batch(&self) -> bool {
		self.pending.is_some()
	}
}
