//! Secure token secret wrapper that redacts sensitive material.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Generates a random alphanumeric secret of `len` characters from the thread-local CSPRNG.
	pub fn generate(len: usize) -> Self {
		Self(rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Base64 (no padding) SHA-256 digest of the secret, safe to use as an index key.
	pub fn digest(&self) -> String {
		digest_str(&self.0)
	}

	/// Compares against a presented value without short-circuiting on the first mismatch.
	pub fn matches(&self, presented: &str) -> bool {
		let lhs = self.0.as_bytes();
		let rhs = presented.as_bytes();

		if lhs.len() != rhs.len() {
			return false;
		}

		lhs.iter().zip(rhs).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Digest used for secret lookups; identical to [`TokenSecret::digest`] for the same input.
pub fn digest_str(value: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(value.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn generated_secrets_are_alphanumeric_and_distinct() {
		let first = TokenSecret::generate(48);
		let second = TokenSecret::generate(48);

		assert_eq!(first.expose().len(), 48);
		assert!(first.expose().chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first, second);
	}

	#[test]
	fn digest_is_stable_and_hides_the_secret() {
		let secret = TokenSecret::new("refresh-abc");

		assert_eq!(secret.digest(), digest_str("refresh-abc"));
		assert_ne!(secret.digest(), digest_str("refresh-abd"));
		assert!(!secret.digest().contains("refresh-abc"));
	}

	#[test]
	fn matches_requires_exact_value() {
		let secret = TokenSecret::new("refresh-abc");

		assert!(secret.matches("refresh-abc"));
		assert!(!secret.matches("refresh-ab"));
		assert!(!secret.matches("refresh-abd"));
	}
}
