use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical handle to an atomic unit of text (a word or a character).
///
/// Handles are produced by an [`Interner`]: two tokens interned from equal
/// text through the same interner share one allocation, so
/// [`Token::ptr_eq`] can stand in for a string comparison.
///
/// Equality and hashing are by value, which keeps tokens usable as map keys
/// even when they come from different interners.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Arc<str>);

/// Ordered tuple of `k-1` tokens identifying a state of an order-`k` chain.
pub type StateKey = Vec<Token>;

impl Token {
	/// The empty placeholder token used to left-pad short states.
	pub fn empty() -> Self {
		intern("")
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Identity comparison: true when both handles point to the same text.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Token {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for Token {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Token {
	fn from(raw: &str) -> Self {
		intern(raw)
	}
}

impl Serialize for Token {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

/// Deserialized tokens go through the process-wide interner.
impl<'de> Deserialize<'de> for Token {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct TokenVisitor;

		impl Visitor<'_> for TokenVisitor {
			type Value = Token;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a token string")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Token, E> {
				Ok(intern(v))
			}
		}

		deserializer.deserialize_str(TokenVisitor)
	}
}

/// Append-only table mapping token text to its canonical handle.
///
/// The first handle created for a given text stays canonical for the
/// lifetime of the interner. Lookups hash the text.
#[derive(Default)]
pub struct Interner {
	table: Mutex<HashSet<Arc<str>>>,
}

impl Interner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the canonical handle for `raw`, creating it on first sight.
	pub fn intern(&self, raw: &str) -> Token {
		let mut table = self.table.lock();
		if let Some(existing) = table.get(raw) {
			return Token(Arc::clone(existing));
		}
		let handle: Arc<str> = Arc::from(raw);
		table.insert(Arc::clone(&handle));
		Token(handle)
	}

	/// Number of distinct tokens seen so far.
	pub fn len(&self) -> usize {
		self.table.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

static GLOBAL: OnceLock<Interner> = OnceLock::new();

/// The process-wide interner, created on first use.
pub fn global() -> &'static Interner {
	GLOBAL.get_or_init(Interner::new)
}

/// Interns `raw` in the process-wide interner.
pub fn intern(raw: &str) -> Token {
	global().intern(raw)
}

/// Interns every element of `raw`, keeping order.
pub fn intern_all<I, S>(raw: I) -> Vec<Token>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	raw.into_iter().map(|s| intern(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;

	#[test]
	fn equal_text_shares_one_handle() {
		let a = intern("hello");
		let owned = String::from("hel") + "lo";
		let b = intern(&owned);
		assert_eq!(a, b);
		assert!(a.ptr_eq(&b));
	}

	#[test]
	fn first_seen_stays_canonical() {
		let interner = Interner::new();
		let first = interner.intern("x");
		for _ in 0..10 {
			assert!(interner.intern("x").ptr_eq(&first));
		}
		assert_eq!(interner.len(), 1);
	}

	#[test]
	fn distinct_text_distinct_handles() {
		let interner = Interner::new();
		let a = interner.intern("a");
		let b = interner.intern("b");
		assert_ne!(a, b);
		assert!(!a.ptr_eq(&b));
		assert_eq!(interner.len(), 2);
	}

	#[test]
	fn concurrent_callers_agree() {
		let handles: Vec<_> = (0..8)
			.map(|_| thread::spawn(|| intern("shared-across-threads")))
			.collect();
		let tokens: Vec<Token> = handles.into_iter().map(|h| h.join().unwrap()).collect();
		assert!(tokens.windows(2).all(|w| w[0].ptr_eq(&w[1])));
	}

	#[test]
	fn deserialize_reinterns() {
		let original = intern("round");
		let json = serde_json::to_string(&original).unwrap();
		assert_eq!(json, "\"round\"");
		let back: Token = serde_json::from_str(&json).unwrap();
		assert!(back.ptr_eq(&original));
	}

	#[test]
	fn empty_placeholder() {
		assert!(Token::empty().is_empty());
		assert!(Token::empty().ptr_eq(&intern("")));
	}
}
