//! Thread-safe in-memory [`RefreshTokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, RefreshToken},
	store::{
		CompareAndSwapOutcome, DuplicatePolicy, InsertOutcome, RefreshTokenStore, StoreError,
		StoreFuture, TokenTable,
	},
};

type SharedTable = Arc<RwLock<TokenTable>>;

/// Thread-safe storage backend that keeps tokens in-process for tests and demos.
///
/// Every mutation runs under a single write lock, which gives `insert_unique` and
/// `compare_and_swap` the atomicity the lifecycle requires.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedTable);
impl MemoryStore {
	fn insert_now(
		table: SharedTable,
		token: RefreshToken,
		policy: DuplicatePolicy,
	) -> Result<InsertOutcome, StoreError> {
		table.write().insert_unique(token, policy)
	}

	fn fetch_by_owner_now(table: SharedTable, owner: AppUserGrant) -> Option<RefreshToken> {
		table.read().fetch_by_owner(&owner)
	}

	fn fetch_by_secret_now(table: SharedTable, secret: String) -> Option<RefreshToken> {
		table.read().fetch_by_secret(&secret)
	}

	fn cas_now(
		table: SharedTable,
		owner: AppUserGrant,
		expected_secret: String,
		replacement: RefreshToken,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		table.write().compare_and_swap(&owner, &expected_secret, replacement)
	}

	fn destroy_now(table: SharedTable, owner: AppUserGrant) -> Option<RefreshToken> {
		table.write().destroy(&owner)
	}
}
impl RefreshTokenStore for MemoryStore {
	fn insert_unique(
		&self,
		token: RefreshToken,
		policy: DuplicatePolicy,
	) -> StoreFuture<'_, InsertOutcome> {
		let table = self.0.clone();

		Box::pin(async move { Self::insert_now(table, token, policy) })
	}

	fn fetch_by_owner<'a>(
		&'a self,
		owner: &'a AppUserGrant,
	) -> StoreFuture<'a, Option<RefreshToken>> {
		let table = self.0.clone();
		let owner = owner.to_owned();

		Box::pin(async move { Ok(Self::fetch_by_owner_now(table, owner)) })
	}

	fn fetch_by_secret<'a>(&'a self, secret: &'a str) -> StoreFuture<'a, Option<RefreshToken>> {
		let table = self.0.clone();
		let secret = secret.to_owned();

		Box::pin(async move { Ok(Self::fetch_by_secret_now(table, secret)) })
	}

	fn compare_and_swap<'a>(
		&'a self,
		owner: &'a AppUserGrant,
		expected_secret: &'a str,
		replacement: RefreshToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let table = self.0.clone();
		let owner = owner.to_owned();
		let expected_secret = expected_secret.to_owned();

		Box::pin(async move { Self::cas_now(table, owner, expected_secret, replacement) })
	}

	fn destroy<'a>(&'a self, owner: &'a AppUserGrant) -> StoreFuture<'a, Option<RefreshToken>> {
		let table = self.0.clone();
		let owner = owner.to_owned();

		Box::pin(async move { Ok(Self::destroy_now(table, owner)) })
	}

	fn count(&self) -> StoreFuture<'_, usize> {
		let table = self.0.clone();

		Box::pin(async move { Ok(table.read().len()) })
	}
}
