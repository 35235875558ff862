//! Error types shared by every chain operation.

use thiserror::Error;

/// Errors produced while training, generating, storing or bulk-loading chains.
#[derive(Error, Debug)]
pub enum ChainError {
	/// Training input shorter than the chain order.
	#[error("not enough data: need at least {needed} tokens, got {got}")]
	InsufficientData { needed: usize, got: usize },

	/// Requested generation length shorter than the chain order.
	#[error("generation length {requested} is shorter than the chain order {needed}")]
	InsufficientLength { needed: usize, requested: usize },

	/// Chain order below 2.
	#[error("chain order must be >= 2, got {0}")]
	InvalidOrder(usize),

	/// Initial state with the wrong number of tokens.
	#[error("state must hold {expected} tokens, got {got}")]
	InvalidState { expected: usize, got: usize },

	/// A random start was requested from a chain that was never trained.
	#[error("chain has no recorded states")]
	EmptyChain,

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A snapshot was requested while the named chain had uncommitted observations.
	#[error("chain {0} has an uncommitted batch")]
	BatchInProgress(String),

	/// A value written by this crate failed to decode.
	#[error("corrupt entry {key} in store {store}: {reason}")]
	CorruptEntry { store: String, key: String, reason: String },

	#[error("storage error: {0}")]
	Storage(#[from] redb::Error),

	#[error("codec error: {0}")]
	Codec(#[from] serde_json::Error),

	#[error("snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// The bulk worker is gone; `finish` reports why.
	#[error("bulk training worker stopped")]
	WorkerStopped,

	#[error("bulk training worker panicked")]
	WorkerPanicked,
}

macro_rules! storage_from {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for ChainError {
				fn from(e: $ty) -> Self {
					ChainError::Storage(e.into())
				}
			}
		)*
	};
}

storage_from!(
	redb::DatabaseError,
	redb::TransactionError,
	redb::TableError,
	redb::StorageError,
	redb::CommitError,
);

impl ChainError {
	/// Whether the caller is expected to skip the input and carry on.
	///
	/// Short lines are routine; everything else is either a caller bug or a
	/// storage failure that must not be retried blindly.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, ChainError::InsufficientData { .. })
	}
}

/// Result alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
