//! Refresh-token exchange: staleness check, access-token minting, and CAS rotation.
//!
//! [`RefreshTokenLifecycle::exchange`] resolves the presented secret, refuses tokens idle for
//! longer than the inactivity window, mints the access token, and rotates the refresh secret
//! through [`RefreshTokenStore::compare_and_swap`](crate::store::RefreshTokenStore). Two
//! concurrent exchanges of the same secret serialize on the owner guard; the loser sees a
//! secret mismatch and fails with `invalid_grant`.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshToken, ScopeSet, TokenSecret},
	lifecycle::{RefreshTokenLifecycle, record_result},
	obs::{self, Operation, OperationOutcome, OperationSpan},
	store::CompareAndSwapOutcome,
};

impl RefreshTokenLifecycle {
	/// Exchanges a refresh secret for an access token and the rotated refresh token.
	///
	/// `requested` narrows the access token's scopes; `None` grants every scope of the refresh
	/// token and `Some` of an empty set grants none. The refresh token's own scopes never change.
	pub async fn exchange(
		&self,
		secret: &str,
		requested: Option<ScopeSet>,
	) -> Result<(AccessToken, RefreshToken)> {
		const OPERATION: Operation = Operation::Exchange;

		let span = OperationSpan::new(OPERATION, "exchange");

		obs::record_operation_outcome(OPERATION, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.exchange_metrics.record_attempt();

				let now = self.clock.now();
				let current = self
					.store
					.fetch_by_secret(secret)
					.await
					.map_err(|err| {
						self.exchange_metrics.record_failure();

						Error::from(err)
					})?
					.ok_or_else(|| {
						self.exchange_metrics.record_failure();

						Error::invalid_grant("refresh token is unknown or was already rotated")
					})?;

				if current.is_stale_at(now, self.config.inactivity_window) {
					self.exchange_metrics.record_stale();
					self.exchange_metrics.record_failure();

					#[cfg(feature = "tracing")]
					tracing::debug!(
						owner = %current.owner,
						idle = %current.idle_for(now),
						"refresh token is stale"
					);

					return Err(Error::invalid_grant("refresh token expired after inactivity"));
				}

				let access =
					self.issuer.issue(&current, requested.as_ref(), now).inspect_err(|err| {
						if matches!(err, Error::InvalidScope { .. }) {
							self.exchange_metrics.record_scope_rejection();
						}

						self.exchange_metrics.record_failure();
					})?;
				let rotated = self.rotate(&current, secret, now).await.inspect_err(|_| {
					self.exchange_metrics.record_failure();
				})?;

				self.exchange_metrics.record_success();

				Ok((access, rotated))
			})
			.await;

		record_result(OPERATION, &result);

		result
	}

	/// Replaces `current`'s secret and activity stamp, provided its secret is still `expected`.
	///
	/// Fails with `invalid_grant` when a concurrent exchange rotated or revoked the token first.
	pub async fn rotate(
		&self,
		current: &RefreshToken,
		expected: &str,
		now: OffsetDateTime,
	) -> Result<RefreshToken> {
		let rotated = current.rotated(TokenSecret::generate(self.config.refresh_secret_len), now);
		let guard = self.uniqueness.guard(&current.owner);
		let outcome = {
			let _serialized = guard.lock().await;

			self.store.compare_and_swap(&current.owner, expected, rotated.clone()).await
		};

		drop(guard);
		self.uniqueness.prune_idle();

		match outcome? {
			CompareAndSwapOutcome::Updated => Ok(rotated),
			CompareAndSwapOutcome::SecretMismatch | CompareAndSwapOutcome::Missing => {
				self.exchange_metrics.record_rotation_conflict();

				#[cfg(feature = "tracing")]
				tracing::debug!(owner = %current.owner, "lost refresh rotation race");

				Err(Error::invalid_grant("refresh token was rotated concurrently"))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::AppUserGrant,
		clock::{Clock, ManualClock},
		config::{LifecycleConfig, MONTH},
	};

	fn owner() -> AppUserGrant {
		test_grant("user", "app")
	}

	fn lifecycle() -> (RefreshTokenLifecycle, ManualClock) {
		let (lifecycle, _store, clock) = build_test_lifecycle(LifecycleConfig::default());

		(lifecycle, clock)
	}

	#[tokio::test]
	async fn stale_exchange_leaves_the_token_untouched() {
		let (lifecycle, clock) = lifecycle();
		let created = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Offline-only grant should be issued.");

		clock.advance(MONTH * 6 + Duration::seconds(1));

		let err = lifecycle
			.exchange(created.token.expose(), None)
			.await
			.expect_err("Stale tokens must not be exchanged.");

		assert!(matches!(err, Error::InvalidGrant { .. }));
		assert_eq!(err.oauth_error_code(), "invalid_grant");
		assert_eq!(
			lifecycle.store.fetch_by_owner(&owner()).await.expect("Lookup should succeed."),
			Some(created)
		);
		assert_eq!(lifecycle.exchange_metrics.stale_rejections(), 1);
		assert_eq!(lifecycle.exchange_metrics.failures(), 1);
	}

	#[tokio::test]
	async fn exchange_at_the_window_boundary_succeeds() {
		let (lifecycle, clock) = lifecycle();
		let created = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Offline-only grant should be issued.");

		clock.advance(MONTH * 6);

		let (_, rotated) = lifecycle
			.exchange(created.token.expose(), None)
			.await
			.expect("A token idle for exactly the window is still fresh.");

		assert_eq!(rotated.updated_at, created.updated_at + MONTH * 6);
	}

	#[tokio::test]
	async fn rotate_rejects_an_outdated_secret() {
		let (lifecycle, clock) = lifecycle();
		let created = lifecycle
			.create_refresh_token(owner(), ScopeSet::offline())
			.await
			.expect("Offline-only grant should be issued.");

		clock.advance(Duration::days(1));

		let first = lifecycle
			.rotate(&created, created.token.expose(), clock.now())
			.await
			.expect("First rotation should win.");
		let err = lifecycle
			.rotate(&created, created.token.expose(), clock.now())
			.await
			.expect_err("Rotating with the replaced secret must fail.");

		assert!(matches!(err, Error::InvalidGrant { .. }));
		assert_eq!(lifecycle.exchange_metrics.rotation_conflicts(), 1);
		assert_eq!(
			lifecycle.store.fetch_by_owner(&owner()).await.expect("Lookup should succeed."),
			Some(first)
		);
	}

	#[tokio::test]
	async fn unknown_secret_is_an_invalid_grant() {
		let (lifecycle, _clock) = lifecycle();
		let err = lifecycle
			.exchange("does-not-exist", None)
			.await
			.expect_err("Unknown secrets must be rejected.");

		assert!(matches!(err, Error::InvalidGrant { .. }));
		assert_eq!(lifecycle.exchange_metrics.attempts(), 1);
		assert_eq!(lifecycle.exchange_metrics.successes(), 0);
	}
}
