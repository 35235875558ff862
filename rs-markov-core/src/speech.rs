//! Chat-facing helpers: learning messages and producing lines from a chain.

use rand::Rng;

use crate::config::{ChainConfig, TopicFallback};
use crate::error::Result;
use crate::model::chain::MarkovChain;
use crate::store::ChainStore;
use crate::text::{self, Granularity, MessageKind};
use crate::token::Token;

/// Trains one message into `chain` as a single batch.
///
/// Returns `Ok(false)` when the message is too short for the chain order.
pub fn learn<S: ChainStore>(
	chain: &mut MarkovChain<S>,
	granularity: Granularity,
	kind: MessageKind,
	message: &str,
) -> Result<bool> {
	let tokens = text::training_tokens(chain.order(), granularity, kind, message);
	let outcome = chain.train_batch(std::iter::once(tokens))?;
	Ok(outcome.trained == 1)
}

/// Generates one line, starting where messages start.
pub fn say<S: ChainStore, R: Rng>(chain: &MarkovChain<S>, config: &ChainConfig, rng: &mut R) -> Result<String> {
	let start = text::message_start(chain.order(), MessageKind::Say);
	let tokens = chain
		.generate_with(config.output_limit.max(chain.order()), Some(start), rng)?
		.collect::<Result<Vec<_>>>()?;
	Ok(render(&tokens, config.granularity))
}

/// Generates one line that starts with `topic`.
///
/// Returns `None` when the chain never saw anything follow the topic. With
/// [`TopicFallback::Capitalized`] the capitalized topic is tried before
/// giving up.
pub fn say_about<S: ChainStore, R: Rng>(
	chain: &MarkovChain<S>,
	topic: &str,
	config: &ChainConfig,
	rng: &mut R,
) -> Result<Option<String>> {
	if let Some(line) = say_about_exact(chain, topic, config, rng)? {
		return Ok(Some(line));
	}
	if config.topic_fallback == TopicFallback::Capitalized {
		let capitalized = capitalize(topic);
		if capitalized != topic {
			return say_about_exact(chain, &capitalized, config, rng);
		}
	}
	Ok(None)
}

fn say_about_exact<S: ChainStore, R: Rng>(
	chain: &MarkovChain<S>,
	topic: &str,
	config: &ChainConfig,
	rng: &mut R,
) -> Result<Option<String>> {
	let topic_tokens = text::tokenize(topic, config.granularity);
	if topic_tokens.is_empty() {
		return Ok(None);
	}

	let mut seed = Vec::with_capacity(topic_tokens.len() + 1);
	seed.push(MessageKind::Say.sigil_token());
	seed.extend(topic_tokens);

	// Keep the last `k-1` tokens as the state; the rest is put back in front.
	let state_len = chain.state_len();
	let cut = seed.len().saturating_sub(state_len);
	let mut tokens = seed[..cut].to_vec();
	let mut state = vec![Token::empty(); state_len - (seed.len() - cut)];
	state.extend_from_slice(&seed[cut..]);

	let generated = chain
		.generate_with(config.output_limit.max(chain.order()), Some(state), rng)?
		.collect::<Result<Vec<_>>>()?;
	if generated.len() <= state_len {
		return Ok(None);
	}
	tokens.extend(generated);
	Ok(Some(render(&tokens, config.granularity)))
}

/// Drops a leading `"<nick>: "` from a generated line.
pub fn strip_addressee<'a>(line: &'a str, nick: &str) -> &'a str {
	line.strip_prefix(nick)
		.and_then(|rest| rest.strip_prefix(": "))
		.unwrap_or(line)
}

/// Text of a generated sequence without padding, sigil or line breaks.
fn render(tokens: &[Token], granularity: Granularity) -> String {
	let mut body = tokens.iter().skip_while(|t| t.is_empty()).peekable();
	let _sigil = body.next_if(|t| MessageKind::is_sigil(t));
	let body: Vec<Token> = body.cloned().collect();
	text::detokenize(&body, granularity).replace('\n', "")
}

fn capitalize(topic: &str) -> String {
	let mut chars = topic.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
