//! Keys are compact JSON arrays of token text (`["a","b"]`): byte-identical
//! for equal states, whitespace-free and unambiguous whatever the tokens
//! contain. Values are compact JSON objects mapping successor text to its
//! count (`{"c":2}`).

use crate::error::Result;
use crate::model::transitions::Transitions;
use crate::token::{StateKey, Token};

pub(crate) fn encode_key(state: &[Token]) -> Result<String> {
	Ok(serde_json::to_string(state)?)
}

pub(crate) fn decode_key(raw: &str) -> serde_json::Result<StateKey> {
	serde_json::from_str(raw)
}

pub(crate) fn encode_value(transitions: &Transitions) -> Result<String> {
	Ok(serde_json::to_string(transitions)?)
}

pub(crate) fn decode_value(raw: &str) -> serde_json::Result<Transitions> {
	serde_json::from_str(raw)
}
