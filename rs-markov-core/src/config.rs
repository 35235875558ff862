use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::text::Granularity;

/// What to do when a topic-seeded generation finds nothing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopicFallback {
	/// Give up: the topic is unknown.
	#[default]
	Exact,
	/// Retry once with the topic's first letter upper-cased.
	Capitalized,
}

/// Parameters shared by every chain of a registry.
///
/// # Invariants
/// - `order >= 2`
/// - `output_limit >= order`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
	/// Chain order `k`. Character chains need larger values than word chains.
	pub order: usize,

	/// Maximum number of tokens produced by one generation.
	pub output_limit: usize,

	pub granularity: Granularity,

	pub topic_fallback: TopicFallback,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			order: 9,
			output_limit: 480,
			granularity: Granularity::Char,
			topic_fallback: TopicFallback::Exact,
		}
	}
}

impl ChainConfig {
	/// Word-level defaults: order 3, 60 words per line.
	pub fn words() -> Self {
		Self {
			order: 3,
			output_limit: 60,
			granularity: Granularity::Word,
			..Self::default()
		}
	}

	/// Sets the chain order.
	///
	/// # Errors
	/// Returns an error if `order < 2` or exceeds the output limit.
	pub fn set_order(&mut self, order: usize) -> Result<()> {
		if order < 2 {
			return Err(ChainError::InvalidOrder(order));
		}
		if order > self.output_limit {
			return Err(ChainError::InvalidConfig(format!(
				"order {order} exceeds output limit {}",
				self.output_limit
			)));
		}
		self.order = order;
		Ok(())
	}

	/// Sets the output limit.
	///
	/// # Errors
	/// Returns an error if `limit` is below the chain order.
	pub fn set_output_limit(&mut self, limit: usize) -> Result<()> {
		if limit < self.order {
			return Err(ChainError::InvalidConfig(format!("output limit {limit} is below order {}", self.order)));
		}
		self.output_limit = limit;
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		if self.order < 2 {
			return Err(ChainError::InvalidOrder(self.order));
		}
		if self.output_limit < self.order {
			return Err(ChainError::InvalidConfig(format!(
				"output limit {} is below order {}",
				self.output_limit, self.order
			)));
		}
		Ok(())
	}
}

/// Bulk training pipeline parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BulkConfig {
	/// Lines the producer may queue ahead of the worker before blocking.
	pub queue_capacity: usize,

	/// Buffered lines per entity that trigger a flush into its chain.
	pub flush_threshold: usize,
}

impl Default for BulkConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 10_000,
			flush_threshold: 800,
		}
	}
}

impl BulkConfig {
	pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_capacity = capacity;
		self
	}

	pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
		self.flush_threshold = threshold;
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.queue_capacity == 0 {
			return Err(ChainError::InvalidConfig("queue capacity must be >= 1".to_owned()));
		}
		if self.flush_threshold == 0 {
			return Err(ChainError::InvalidConfig("flush threshold must be >= 1".to_owned()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		ChainConfig::default().validate().unwrap();
		ChainConfig::words().validate().unwrap();
		BulkConfig::default().validate().unwrap();
		assert_eq!(BulkConfig::default().flush_threshold, 800);
		assert_eq!(BulkConfig::default().queue_capacity, 10_000);
	}

	#[test]
	fn setters_validate() {
		let mut config = ChainConfig::default();
		assert!(config.set_order(1).is_err());
		assert!(config.set_order(1_000).is_err());
		config.set_order(4).unwrap();
		assert!(matches!(config.set_output_limit(3), Err(ChainError::InvalidConfig(_))));
		config.set_output_limit(4).unwrap();
		assert_eq!(config.output_limit, 4);

		config.output_limit = 2;
		assert!(matches!(config.validate(), Err(ChainError::InvalidConfig(_))));
	}

	#[test]
	fn zero_sizes_rejected() {
		assert!(BulkConfig::default().with_queue_capacity(0).validate().is_err());
		assert!(BulkConfig::default().with_flush_threshold(0).validate().is_err());
	}
}
