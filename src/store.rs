//! Storage contracts and built-in store implementations for refresh tokens.
//!
//! Stores key refresh tokens by their owning [`AppUserGrant`] and keep a secondary index from
//! the SHA-256 digest of each secret to its owner, so exchanges can resolve a presented secret
//! without the plaintext ever becoming a map key.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, RefreshToken, digest_str},
};

/// Boxed future returned by every [`RefreshTokenStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by refresh-token stores.
///
/// Implementations must make [`insert_unique`](Self::insert_unique) and
/// [`compare_and_swap`](Self::compare_and_swap) atomic with respect to each other for the
/// same owner; the lifecycle relies on them instead of check-then-write sequences.
pub trait RefreshTokenStore
where
	Self: Send + Sync,
{
	/// Inserts `token`, resolving an existing token for the same owner via `policy`.
	fn insert_unique(
		&self,
		token: RefreshToken,
		policy: DuplicatePolicy,
	) -> StoreFuture<'_, InsertOutcome>;

	/// Fetches the token owned by `owner`, if present.
	fn fetch_by_owner<'a>(
		&'a self,
		owner: &'a AppUserGrant,
	) -> StoreFuture<'a, Option<RefreshToken>>;

	/// Fetches the token whose current secret equals `secret`, if present.
	fn fetch_by_secret<'a>(&'a self, secret: &'a str) -> StoreFuture<'a, Option<RefreshToken>>;

	/// Atomically replaces the owner's token if its current secret equals `expected_secret`.
	fn compare_and_swap<'a>(
		&'a self,
		owner: &'a AppUserGrant,
		expected_secret: &'a str,
		replacement: RefreshToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Removes the owner's token, returning it if one existed.
	fn destroy<'a>(&'a self, owner: &'a AppUserGrant) -> StoreFuture<'a, Option<RefreshToken>>;

	/// Number of persisted tokens.
	fn count(&self) -> StoreFuture<'_, usize>;
}

/// What to do when a grant that already owns a refresh token is issued another one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Destroy the existing token and store the new one.
	#[default]
	Replace,
	/// Leave the existing token untouched and hand it back.
	KeepExisting,
	/// Leave the existing token untouched and report [`InsertOutcome::Rejected`].
	Reject,
}

/// Result of [`RefreshTokenStore::insert_unique`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
	/// No token existed for the owner; the new one was stored.
	Inserted,
	/// The owner's previous token was destroyed in favor of the new one.
	Replaced {
		/// Token that was destroyed.
		previous: RefreshToken,
	},
	/// The owner's token was kept and the new one discarded.
	KeptExisting {
		/// Token that remains persisted.
		existing: RefreshToken,
	},
	/// The owner already has a token and the policy forbids another.
	Rejected,
}

/// Result of a refresh-secret compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The secret matched the expected value and the token was replaced.
	Updated,
	/// A token exists for the owner but its secret differs from the expected value.
	SecretMismatch,
	/// No token exists for the owner.
	Missing,
}

/// Error type produced by [`RefreshTokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Owner-keyed token table with a digest index; the in-process state behind the built-in stores.
#[derive(Clone, Debug, Default)]
pub(crate) struct TokenTable {
	by_owner: HashMap<AppUserGrant, RefreshToken>,
	by_digest: HashMap<String, AppUserGrant>,
}
impl TokenTable {
	pub(crate) fn from_tokens(
		tokens: impl IntoIterator<Item = RefreshToken>,
	) -> Result<Self, StoreError> {
		let mut table = Self::default();

		for token in tokens {
			table.ensure_digest_free(&token)?;
			table.put(token);
		}

		Ok(table)
	}

	pub(crate) fn tokens(&self) -> impl Iterator<Item = &RefreshToken> {
		self.by_owner.values()
	}

	pub(crate) fn len(&self) -> usize {
		self.by_owner.len()
	}

	pub(crate) fn insert_unique(
		&mut self,
		token: RefreshToken,
		policy: DuplicatePolicy,
	) -> Result<InsertOutcome, StoreError> {
		let existing = self.by_owner.get(&token.owner).cloned();
		let outcome = match (existing, policy) {
			(None, _) => {
				self.ensure_digest_free(&token)?;
				self.put(token);

				InsertOutcome::Inserted
			},
			(Some(existing), DuplicatePolicy::KeepExisting) =>
				InsertOutcome::KeptExisting { existing },
			(Some(_), DuplicatePolicy::Reject) => InsertOutcome::Rejected,
			(Some(_), DuplicatePolicy::Replace) => {
				self.ensure_digest_free(&token)?;

				match self.put(token) {
					Some(previous) => InsertOutcome::Replaced { previous },
					None => InsertOutcome::Inserted,
				}
			},
		};

		Ok(outcome)
	}

	pub(crate) fn fetch_by_owner(&self, owner: &AppUserGrant) -> Option<RefreshToken> {
		self.by_owner.get(owner).cloned()
	}

	pub(crate) fn fetch_by_secret(&self, secret: &str) -> Option<RefreshToken> {
		self.by_digest
			.get(&digest_str(secret))
			.and_then(|owner| self.by_owner.get(owner))
			.filter(|token| token.token.matches(secret))
			.cloned()
	}

	pub(crate) fn compare_and_swap(
		&mut self,
		owner: &AppUserGrant,
		expected_secret: &str,
		replacement: RefreshToken,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		if &replacement.owner != owner {
			return Err(StoreError::Backend {
				message: format!("Replacement for {owner} belongs to {}", replacement.owner),
			});
		}

		let outcome = match self.by_owner.get(owner) {
			Some(current) if current.token.matches(expected_secret) =>
				CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::SecretMismatch,
			None => CompareAndSwapOutcome::Missing,
		};

		if matches!(outcome, CompareAndSwapOutcome::Updated) {
			self.ensure_digest_free(&replacement)?;
			self.put(replacement);
		}

		Ok(outcome)
	}

	pub(crate) fn destroy(&mut self, owner: &AppUserGrant) -> Option<RefreshToken> {
		let removed = self.by_owner.remove(owner)?;

		self.by_digest.remove(&removed.token.digest());

		Some(removed)
	}

	/// Fails when the token's secret already indexes a token of another owner.
	fn ensure_digest_free(&self, token: &RefreshToken) -> Result<(), StoreError> {
		match self.by_digest.get(&token.token.digest()) {
			Some(holder) if holder != &token.owner => Err(StoreError::Backend {
				message: format!("Secret for {} is already held by {holder}", token.owner),
			}),
			_ => Ok(()),
		}
	}

	fn put(&mut self, token: RefreshToken) -> Option<RefreshToken> {
		let previous = self.destroy(&token.owner);

		self.by_digest.insert(token.token.digest(), token.owner.clone());
		self.by_owner.insert(token.owner.clone(), token);

		previous
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{AppId, ScopeSet, ScopeVocabulary, TokenSecret, UserId};

	fn owner(user: &str) -> AppUserGrant {
		AppUserGrant::new(
			UserId::new(user).expect("User fixture should be valid."),
			AppId::new("app").expect("App fixture should be valid."),
		)
	}

	fn token(owner: AppUserGrant, secret: &str) -> RefreshToken {
		RefreshToken::builder(owner, ScopeSet::offline())
			.token(secret)
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.build(&ScopeVocabulary::default())
			.expect("Refresh token fixture should build.")
	}

	#[test]
	fn replace_policy_drops_the_old_secret_index() {
		let mut table = TokenTable::default();

		assert_eq!(
			table.insert_unique(token(owner("u1"), "first"), DuplicatePolicy::Replace),
			Ok(InsertOutcome::Inserted)
		);
		assert!(matches!(
			table.insert_unique(token(owner("u1"), "second"), DuplicatePolicy::Replace),
			Ok(InsertOutcome::Replaced { previous }) if previous.token.expose() == "first"
		));
		assert_eq!(table.len(), 1);
		assert!(table.fetch_by_secret("first").is_none());
		assert!(table.fetch_by_secret("second").is_some());
	}

	#[test]
	fn keep_and_reject_policies_leave_the_table_alone() {
		let mut table = TokenTable::from_tokens([token(owner("u1"), "first")])
			.expect("Seed table should load.");

		assert!(matches!(
			table.insert_unique(token(owner("u1"), "second"), DuplicatePolicy::KeepExisting),
			Ok(InsertOutcome::KeptExisting { existing }) if existing.token.expose() == "first"
		));
		assert_eq!(
			table.insert_unique(token(owner("u1"), "third"), DuplicatePolicy::Reject),
			Ok(InsertOutcome::Rejected)
		);
		assert_eq!(table.len(), 1);
		assert!(table.fetch_by_secret("second").is_none());
		assert!(table.fetch_by_secret("third").is_none());
	}

	#[test]
	fn compare_and_swap_refuses_foreign_replacements() {
		let mut table = TokenTable::from_tokens([token(owner("u1"), "first")])
			.expect("Seed table should load.");
		let foreign = token(owner("u2"), "other");
		let err = table
			.compare_and_swap(&owner("u1"), "first", foreign)
			.expect_err("Replacements must belong to the same owner.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(table.fetch_by_secret("first").is_some());
	}

	#[test]
	fn compare_and_swap_reindexes_the_secret() {
		let mut table = TokenTable::from_tokens([token(owner("u1"), "first")])
			.expect("Seed table should load.");
		let current = table.fetch_by_owner(&owner("u1")).expect("Seeded token should exist.");
		let rotated =
			current.rotated(TokenSecret::new("second"), macros::datetime!(2025-02-01 00:00 UTC));
		let outcome = table
			.compare_and_swap(&owner("u1"), "first", rotated)
			.expect("Same-owner CAS should not error.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);
		assert!(table.fetch_by_secret("first").is_none());
		assert_eq!(
			table.fetch_by_secret("second").map(|t| t.updated_at),
			Some(macros::datetime!(2025-02-01 00:00 UTC))
		);
	}

	#[test]
	fn shared_secret_across_owners_is_refused() {
		let mut table = TokenTable::from_tokens([token(owner("u1"), "shared")])
			.expect("Seed table should load.");
		let err = table
			.insert_unique(token(owner("u2"), "shared"), DuplicatePolicy::Replace)
			.expect_err("A secret already held by another grant must not be indexed twice.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert_eq!(table.len(), 1);
		assert_eq!(table.fetch_by_secret("shared").map(|t| t.owner), Some(owner("u1")));

		table
			.insert_unique(token(owner("u2"), "own"), DuplicatePolicy::Replace)
			.expect("A distinct secret should insert.");

		let current = table.fetch_by_owner(&owner("u2")).expect("Second grant should be stored.");
		let clashing =
			current.rotated(TokenSecret::new("shared"), macros::datetime!(2025-02-01 00:00 UTC));
		let err = table
			.compare_and_swap(&owner("u2"), "own", clashing)
			.expect_err("Rotating onto another grant's secret must fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(table.fetch_by_secret("own").is_some());
		assert_eq!(table.fetch_by_secret("shared").map(|t| t.owner), Some(owner("u1")));
		assert!(
			TokenTable::from_tokens([token(owner("u1"), "dup"), token(owner("u2"), "dup")])
				.is_err(),
			"snapshots with a shared secret must not load"
		);
	}

	#[test]
	fn duplicate_policy_serializes_snake_case() {
		let payload = serde_json::to_string(&DuplicatePolicy::KeepExisting)
			.expect("Duplicate policy should serialize to JSON.");

		assert_eq!(payload, "\"keep_existing\"");
	}
}
