//! Concurrent bulk training.
//!
//! One producer pushes `(entity, line)` pairs into a bounded queue; one
//! worker thread buffers lines per entity and trains a full buffer into the
//! entity's chain inside a single storage batch. Being the only consumer,
//! the worker is the only writer of every chain it touches.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error, info};

use crate::config::BulkConfig;
use crate::error::{ChainError, Result};
use crate::registry::{ChainRegistry, StoreFactory};
use crate::text::{self, Granularity, MessageKind};

/// Item travelling from the producer to the worker.
#[derive(Debug)]
enum BulkMessage {
	Line { entity: String, kind: MessageKind, text: String },
	/// End of stream: flush everything and stop
	Finish,
}

/// Counters collected by the worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrainReport {
	pub lines_received: usize,
	/// Lines trained into a chain
	pub lines_trained: usize,
	/// Lines too short for the chain order
	pub lines_skipped: usize,
	/// Storage batches committed
	pub flushes: usize,
	/// Distinct chains that received at least one batch
	pub chains_touched: usize,
}

/// Handle on a running bulk training pipeline.
///
/// The registry is moved into the worker and handed back by
/// [`finish`](BulkTrainer::finish). While the pipeline runs, nothing else
/// may write to the chains it trains.
pub struct BulkTrainer<F: StoreFactory> {
	sender: Sender<BulkMessage>,
	worker: thread::JoinHandle<Result<(ChainRegistry<F>, TrainReport)>>,
}

impl<F> BulkTrainer<F>
where
	F: StoreFactory + Send + 'static,
	F::Store: Send,
{
	/// Starts the worker thread.
	///
	/// # Errors
	/// Returns an error if `config` is invalid or the thread cannot be spawned.
	pub fn spawn(registry: ChainRegistry<F>, granularity: Granularity, config: BulkConfig) -> Result<Self> {
		config.validate()?;
		let (sender, receiver) = bounded(config.queue_capacity);
		let worker = Worker {
			registry,
			granularity,
			threshold: config.flush_threshold,
			buffers: HashMap::new(),
			touched: HashSet::new(),
			report: TrainReport::default(),
		};
		let worker = thread::Builder::new()
			.name("bulk-trainer".to_owned())
			.spawn(move || worker.run(receiver))?;
		Ok(Self { sender, worker })
	}

	/// Queues an ordinary message for `entity`. Blocks while the queue is full.
	///
	/// # Errors
	/// [`ChainError::WorkerStopped`] if the worker has exited; call
	/// [`finish`](Self::finish) to learn why.
	pub fn submit(&self, entity: impl Into<String>, line: impl Into<String>) -> Result<()> {
		self.submit_message(entity, MessageKind::Say, line)
	}

	/// Queues a message of the given kind for `entity`.
	pub fn submit_message(&self, entity: impl Into<String>, kind: MessageKind, text: impl Into<String>) -> Result<()> {
		let message = BulkMessage::Line { entity: entity.into(), kind, text: text.into() };
		self.sender.send(message).map_err(|_| ChainError::WorkerStopped)
	}

	/// Signals end of stream, waits for every buffer to be flushed and
	/// returns the registry with the run's counters.
	pub fn finish(self) -> Result<(ChainRegistry<F>, TrainReport)> {
		// A stopped worker has dropped its receiver; its own error is returned by join.
		let _ = self.sender.send(BulkMessage::Finish);
		match self.worker.join() {
			Ok(outcome) => outcome,
			Err(_) => Err(ChainError::WorkerPanicked),
		}
	}

	/// Runs a whole pipeline over `items`.
	pub fn train_all<I, E, L>(
		registry: ChainRegistry<F>,
		granularity: Granularity,
		config: BulkConfig,
		items: I,
	) -> Result<(ChainRegistry<F>, TrainReport)>
	where
		I: IntoIterator<Item = (E, L)>,
		E: Into<String>,
		L: Into<String>,
	{
		let trainer = Self::spawn(registry, granularity, config)?;
		for (entity, line) in items {
			if trainer.submit(entity, line).is_err() {
				break;
			}
		}
		trainer.finish()
	}
}

struct Worker<F: StoreFactory> {
	registry: ChainRegistry<F>,
	granularity: Granularity,
	threshold: usize,
	/// Untrained lines per entity, in arrival order
	buffers: HashMap<String, Vec<(MessageKind, String)>>,
	touched: HashSet<String>,
	report: TrainReport,
}

impl<F: StoreFactory> Worker<F> {
	fn run(mut self, receiver: Receiver<BulkMessage>) -> Result<(ChainRegistry<F>, TrainReport)> {
		info!("bulk trainer started (flush threshold {})", self.threshold);
		if let Err(e) = self.consume(&receiver) {
			error!("bulk trainer stopped: {e}");
			return Err(e);
		}
		info!(
			"bulk trainer finished: {} lines, {} trained, {} skipped, {} flushes over {} chains",
			self.report.lines_received,
			self.report.lines_trained,
			self.report.lines_skipped,
			self.report.flushes,
			self.report.chains_touched
		);
		Ok((self.registry, self.report))
	}

	fn consume(&mut self, receiver: &Receiver<BulkMessage>) -> Result<()> {
		loop {
			match receiver.recv() {
				Ok(BulkMessage::Line { entity, kind, text }) => {
					self.report.lines_received += 1;
					let buffer = self.buffers.entry(entity.clone()).or_default();
					buffer.push((kind, text));
					if buffer.len() >= self.threshold {
						let lines = self.buffers.remove(&entity).unwrap_or_default();
						self.flush(&entity, lines)?;
					}
				}
				// Every sender gone counts as end of stream too.
				Ok(BulkMessage::Finish) | Err(_) => break,
			}
		}
		self.flush_all()
	}

	fn flush_all(&mut self) -> Result<()> {
		let mut pending: Vec<(String, Vec<(MessageKind, String)>)> = mem::take(&mut self.buffers).into_iter().collect();
		pending.sort_by(|a, b| a.0.cmp(&b.0));
		for (entity, lines) in pending {
			self.flush(&entity, lines)?;
		}
		Ok(())
	}

	/// Trains `lines` into the chain of `entity` as one batch.
	fn flush(&mut self, entity: &str, lines: Vec<(MessageKind, String)>) -> Result<()> {
		if lines.is_empty() {
			return Ok(());
		}
		let granularity = self.granularity;
		let chain = self.registry.chain(entity)?;
		let order = chain.order();
		let sequences = lines.iter().map(|(kind, line)| text::training_tokens(order, granularity, *kind, line));
		let outcome = chain.train_batch(sequences)?;

		self.report.lines_trained += outcome.trained;
		self.report.lines_skipped += outcome.skipped;
		self.report.flushes += 1;
		if self.touched.insert(entity.to_owned()) {
			self.report.chains_touched += 1;
		}
		debug!("flushed {} lines into {entity}", lines.len());
		Ok(())
	}
}
