//! Splitting messages into tokens and joining them back.

use serde::{Deserialize, Serialize};

use crate::token::{self, Token};

/// Size of a token.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Granularity {
	/// One token per character
	#[default]
	Char,
	/// One token per whitespace-separated word
	Word,
}

/// Type of a chat message, marked by a sigil token at its start.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MessageKind {
	/// Ordinary message
	#[default]
	Say,
	/// Action (`/me ...`)
	Action,
}

impl MessageKind {
	pub fn sigil(self) -> &'static str {
		match self {
			MessageKind::Say => "v",
			MessageKind::Action => "a",
		}
	}

	pub fn sigil_token(self) -> Token {
		token::intern(self.sigil())
	}

	/// Whether `token` is one of the message sigils.
	pub fn is_sigil(token: &Token) -> bool {
		matches!(token.as_str(), "v" | "a")
	}
}

/// Splits `text` into interned tokens.
pub fn tokenize(text: &str, granularity: Granularity) -> Vec<Token> {
	match granularity {
		Granularity::Char => {
			let mut buf = [0u8; 4];
			text.chars().map(|c| token::intern(c.encode_utf8(&mut buf))).collect()
		}
		Granularity::Word => text.split_whitespace().map(token::intern).collect(),
	}
}

/// Joins tokens back into text.
pub fn detokenize(tokens: &[Token], granularity: Granularity) -> String {
	let parts = tokens.iter().map(Token::as_str).filter(|t| !t.is_empty());
	match granularity {
		Granularity::Char => parts.collect(),
		Granularity::Word => parts.collect::<Vec<_>>().join(" "),
	}
}

/// Token sequence used to train one message into a chain of order `order`.
///
/// `order - 2` empty tokens, then the sigil, then the message, so that the
/// first state of every message is `("", .., "", sigil)`.
pub fn training_tokens(order: usize, granularity: Granularity, kind: MessageKind, text: &str) -> Vec<Token> {
	let padding = order.saturating_sub(2);
	let mut tokens = Vec::with_capacity(padding + 1 + text.len());
	tokens.extend(std::iter::repeat_n(Token::empty(), padding));
	tokens.push(kind.sigil_token());
	tokens.extend(tokenize(text, granularity));
	tokens
}

/// State every message starts from: `order - 2` empty tokens and the sigil.
pub fn message_start(order: usize, kind: MessageKind) -> Vec<Token> {
	let mut state = vec![Token::empty(); order.saturating_sub(2)];
	state.push(kind.sigil_token());
	state
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn char_tokens() {
		let tokens = tokenize("héllo", Granularity::Char);
		assert_eq!(tokens.len(), 5);
		assert_eq!(tokens[1].as_str(), "é");
		assert_eq!(detokenize(&tokens, Granularity::Char), "héllo");
	}

	#[test]
	fn word_tokens() {
		let tokens = tokenize("  hello   big world ", Granularity::Word);
		let words: Vec<&str> = tokens.iter().map(Token::as_str).collect();
		assert_eq!(words, ["hello", "big", "world"]);
		assert_eq!(detokenize(&tokens, Granularity::Word), "hello big world");
	}

	#[test]
	fn padded_training_sequence() {
		let tokens = training_tokens(4, Granularity::Char, MessageKind::Action, "hi");
		let raw: Vec<&str> = tokens.iter().map(Token::as_str).collect();
		assert_eq!(raw, ["", "", "a", "h", "i"]);
		assert_eq!(&tokens[..3], &message_start(4, MessageKind::Action)[..]);
	}

	#[test]
	fn order_two_has_no_padding() {
		let tokens = training_tokens(2, Granularity::Word, MessageKind::Say, "hi there");
		assert_eq!(tokens[0].as_str(), "v");
		assert_eq!(message_start(2, MessageKind::Say).len(), 1);
	}
}
