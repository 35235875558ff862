//! Markov-chain text generation library.
//!
//! This crate provides:
//! - Fixed-order Markov chains over interned tokens (words or characters)
//! - Two storage backends behind one trait: in-memory and redb-backed
//! - A bulk training pipeline feeding many named chains from one stream
//! - Chat-oriented helpers (learning messages, topic-seeded lines)
//! - Whole-collection snapshots for in-memory chains

/// Error type and result alias.
pub mod error;

/// Chain and pipeline configuration.
pub mod config;

/// Token handles and the process-wide interner.
pub mod token;

/// Tokenization, message sigils and padding.
pub mod text;

/// Chain engine: training, generation, successor tables.
pub mod model;

/// Transition-table storage backends.
pub mod store;

/// Named chains created on demand.
pub mod registry;

/// Producer/worker bulk training.
pub mod bulk;

/// Generating chat lines from a chain.
pub mod speech;

/// Saving and restoring in-memory chains.
pub mod snapshot;

/// I/O utilities (line reading, atomic writes).
///
/// Not exposed
pub(crate) mod io;

pub use bulk::{BulkTrainer, TrainReport};
pub use config::{BulkConfig, ChainConfig, TopicFallback};
pub use error::{ChainError, Result};
pub use model::chain::{BatchOutcome, MarkovChain};
pub use model::generation::Generation;
pub use model::transitions::Transitions;
pub use registry::{ChainRegistry, Ephemeral, StoreFactory};
pub use snapshot::Snapshot;
pub use store::{ChainStore, Environment, MemoryStore, PersistentStore};
pub use text::{Granularity, MessageKind};
pub use token::{Interner, StateKey, Token, intern};
