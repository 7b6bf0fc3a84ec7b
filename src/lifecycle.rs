//! Refresh-token lifecycle orchestration: issuance, exchange, lookup, and revocation.

pub mod uniqueness;

mod exchange;
mod metrics;

pub use metrics::ExchangeMetrics;
pub use uniqueness::UniquenessEnforcer;

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, RefreshToken, RefreshTokenStatus, ScopeSet, ScopeValidationError},
	clock::{Clock, SystemClock},
	config::LifecycleConfig,
	issuer::AccessTokenIssuer,
	obs::{self, Operation, OperationOutcome, OperationSpan},
	store::RefreshTokenStore,
};

/// Coordinates refresh tokens for every grant backed by one store.
///
/// The lifecycle owns the store, clock, issuer, and configuration so each operation can focus
/// on its own state transition. Nothing is cached between calls: every operation re-reads the
/// store before deciding.
#[derive(Clone)]
pub struct RefreshTokenLifecycle {
	/// Token store shared by every operation.
	pub store: Arc<dyn RefreshTokenStore>,
	/// Time source for activity stamps and staleness checks.
	pub clock: Arc<dyn Clock>,
	/// Settings applied to every operation.
	pub config: LifecycleConfig,
	/// Access-token minter used by exchanges.
	pub issuer: AccessTokenIssuer,
	/// Shared counters for exchange outcomes.
	pub exchange_metrics: Arc<ExchangeMetrics>,
	uniqueness: Arc<UniquenessEnforcer>,
}
impl RefreshTokenLifecycle {
	/// Creates a lifecycle over `store` using the wall clock.
	pub fn new(store: Arc<dyn RefreshTokenStore>, config: LifecycleConfig) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			store,
			clock: Arc::new(SystemClock),
			issuer: AccessTokenIssuer::from_config(&config),
			config,
			exchange_metrics: Default::default(),
			uniqueness: Default::default(),
		})
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Checks whether `scopes` could back a refresh token.
	pub fn validate(&self, scopes: &ScopeSet) -> Result<(), ScopeValidationError> {
		self.config.vocabulary.validate(scopes)
	}

	/// Issues the refresh token for a grant the user just authorized.
	///
	/// The grant ends up with exactly one live token. What happens to a token it already
	/// owns follows [`LifecycleConfig::duplicate_policy`].
	pub async fn create_refresh_token(
		&self,
		owner: AppUserGrant,
		scopes: ScopeSet,
	) -> Result<RefreshToken> {
		const OPERATION: Operation = Operation::Create;

		let span = OperationSpan::new(OPERATION, "create_refresh_token");

		obs::record_operation_outcome(OPERATION, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let now = self.clock.now();
				let token = RefreshToken::builder(owner, scopes)
					.secret_len(self.config.refresh_secret_len)
					.issued_at(now)
					.build(&self.config.vocabulary)?;

				self.uniqueness
					.enforce_single(
						self.store.as_ref(),
						token,
						self.config.duplicate_policy,
						now,
						self.config.inactivity_window,
					)
					.await
			})
			.await;

		record_result(OPERATION, &result);

		result
	}

	/// Returns the grant's token if it exists and is still fresh.
	pub async fn find_active(&self, owner: &AppUserGrant) -> Result<Option<RefreshToken>> {
		let now = self.clock.now();
		let token = self.store.fetch_by_owner(owner).await?;

		Ok(token.filter(|token| !token.is_stale_at(now, self.config.inactivity_window)))
	}

	/// Liveness of the token holding `secret`, or `None` if no token does.
	pub async fn status(&self, secret: &str) -> Result<Option<RefreshTokenStatus>> {
		let now = self.clock.now();
		let token = self.store.fetch_by_secret(secret).await?;

		Ok(token.map(|token| token.status_at(now, self.config.inactivity_window)))
	}

	/// Destroys the grant's token, e.g. when the user revokes the app or the grant is deleted.
	///
	/// Idempotent: revoking a grant without a token returns `Ok(None)`.
	pub async fn revoke(&self, owner: &AppUserGrant) -> Result<Option<RefreshToken>> {
		const OPERATION: Operation = Operation::Revoke;

		let span = OperationSpan::new(OPERATION, "revoke");

		obs::record_operation_outcome(OPERATION, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = self.uniqueness.guard(owner);
				let removed = {
					let _serialized = guard.lock().await;

					self.store.destroy(owner).await
				};

				drop(guard);
				self.uniqueness.prune_idle();

				#[cfg(feature = "tracing")]
				tracing::debug!(
					owner = %owner,
					removed = matches!(removed, Ok(Some(_))),
					"revoked grant"
				);

				Ok(removed?)
			})
			.await;

		record_result(OPERATION, &result);

		result
	}
}
impl Debug for RefreshTokenLifecycle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenLifecycle")
			.field("clock", &self.clock)
			.field("config", &self.config)
			.field("issuer", &self.issuer)
			.finish()
	}
}

fn record_result<T>(operation: Operation, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_operation_outcome(operation, OperationOutcome::Success),
		Err(_) => obs::record_operation_outcome(operation, OperationOutcome::Failure),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::ScopeVocabulary,
		config::MONTH,
		store::{DuplicatePolicy, MemoryStore},
	};

	fn owner() -> AppUserGrant {
		test_grant("user", "app")
	}

	#[test]
	fn invalid_config_is_rejected_up_front() {
		let config = LifecycleConfig::default().with_inactivity_window(Duration::ZERO);
		let err = RefreshTokenLifecycle::new(Arc::new(MemoryStore::default()), config)
			.expect_err("A zero inactivity window must be rejected.");

		assert!(matches!(err, Error::Config(_)));
	}

	#[tokio::test]
	async fn find_active_hides_stale_tokens() {
		let (lifecycle, _store, clock) = build_test_lifecycle(LifecycleConfig::default());
		let created = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Offline-only grant should be issued.");

		assert_eq!(created.created_at, TEST_EPOCH);
		assert_eq!(
			lifecycle.find_active(&owner()).await.expect("Lookup should succeed."),
			Some(created.clone())
		);
		assert_eq!(
			lifecycle.status(created.token.expose()).await.expect("Status should succeed."),
			Some(RefreshTokenStatus::Fresh)
		);

		clock.advance(MONTH * 7);

		assert_eq!(lifecycle.find_active(&owner()).await.expect("Lookup should succeed."), None);
		assert_eq!(
			lifecycle.status(created.token.expose()).await.expect("Status should succeed."),
			Some(RefreshTokenStatus::Stale)
		);
		assert_eq!(lifecycle.status("unknown").await.expect("Status should succeed."), None);
	}

	#[tokio::test]
	async fn keep_existing_policy_returns_the_live_token() {
		let config = LifecycleConfig::default().with_duplicate_policy(DuplicatePolicy::KeepExisting);
		let (lifecycle, store, _clock) = build_test_lifecycle(config);
		let first = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("First grant should be issued.");
		let second = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Second grant should resolve to the first.");

		assert_eq!(first, second);
		assert_eq!(store.count().await.expect("Count should succeed."), 1);
	}

	#[tokio::test]
	async fn create_surfaces_validation_errors() {
		let (lifecycle, store, _clock) = build_test_lifecycle(LifecycleConfig::default());
		let scopes = ScopeSet::new(["wadus"]).expect("Scope fixture should be valid.");
		let err = lifecycle
			.create_refresh_token(owner(), scopes)
			.await
			.expect_err("Unsupported scopes must be rejected.");

		assert!(matches!(err, Error::Validation(_)));
		assert!(err.to_string().contains("wadus"));
		assert_eq!(store.count().await.expect("Count should succeed."), 0);
	}

	#[tokio::test]
	async fn revoke_is_idempotent() {
		let (lifecycle, store, _clock) = build_test_lifecycle(LifecycleConfig::default());
		let created = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Offline-only grant should be issued.");
		let removed = lifecycle.revoke(&owner()).await.expect("First revoke should succeed.");

		assert_eq!(removed, Some(created));
		assert_eq!(lifecycle.revoke(&owner()).await.expect("Second revoke should succeed."), None);
		assert_eq!(store.count().await.expect("Count should succeed."), 0);
	}

	#[test]
	fn validate_uses_the_configured_vocabulary() {
		let config =
			LifecycleConfig::default().with_vocabulary(ScopeVocabulary::new(["user:profile"]));
		let (lifecycle, _store, _clock) = build_test_lifecycle(config);
		let ok = ScopeSet::new(["offline", "user:profile"]).expect("Scope fixture should be valid.");
		let bad = ScopeSet::new(["offline", "wadus"]).expect("Scope fixture should be valid.");

		assert!(lifecycle.validate(&ok).is_ok());
		assert!(matches!(
			lifecycle.validate(&bad),
			Err(ScopeValidationError::UnsupportedScopes { scopes }) if scopes == ["wadus"]
		));
	}
}
