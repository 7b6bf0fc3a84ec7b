//! Single-live-token-per-grant enforcement.
//!
//! Creation goes through two layers: a per-owner async guard serializes lifecycle calls for the
//! same grant inside this process, and the store's atomic
//! [`insert_unique`](RefreshTokenStore::insert_unique) keeps the invariant across handles
//! sharing one backend. [`FileStore`](crate::store::FileStore) provides that atomicity with an
//! advisory file lock held across each load-modify-persist cycle.

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, RefreshToken},
	store::{DuplicatePolicy, InsertOutcome, RefreshTokenStore},
};

/// Guarantees the store never holds two live refresh tokens for the same grant.
#[derive(Debug, Default)]
pub struct UniquenessEnforcer {
	guards: Mutex<HashMap<AppUserGrant, Arc<AsyncMutex<()>>>>,
}
impl UniquenessEnforcer {
	/// Returns (and creates on demand) the serialization guard for `owner`.
	pub fn guard(&self, owner: &AppUserGrant) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(owner.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Drops guards nobody holds or waits on.
	pub fn prune_idle(&self) {
		self.guards.lock().retain(|_, guard| Arc::strong_count(guard) > 1);
	}

	/// Number of guards currently tracked.
	pub fn tracked(&self) -> usize {
		self.guards.lock().len()
	}

	/// Stores `token` as the only live token of its owner.
	///
	/// An existing token that is already stale at `now` is not live, so it is replaced
	/// regardless of `policy`.
	pub async fn enforce_single(
		&self,
		store: &dyn RefreshTokenStore,
		token: RefreshToken,
		policy: DuplicatePolicy,
		now: OffsetDateTime,
		inactivity_window: Duration,
	) -> Result<RefreshToken> {
		let owner = token.owner.clone();
		let guard = self.guard(&owner);
		let result = {
			let _serialized = guard.lock().await;
			let policy = match store.fetch_by_owner(&owner).await? {
				Some(existing) if existing.is_stale_at(now, inactivity_window) =>
					DuplicatePolicy::Replace,
				_ => policy,
			};

			match store.insert_unique(token.clone(), policy).await? {
				InsertOutcome::Inserted | InsertOutcome::Replaced { .. } => Ok(token),
				InsertOutcome::KeptExisting { existing } => Ok(existing),
				InsertOutcome::Rejected => Err(Error::DuplicateOwner { owner }),
			}
		};

		drop(guard);
		self.prune_idle();

		result
	}
}
