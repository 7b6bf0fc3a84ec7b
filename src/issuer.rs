//! Access-token minting bound to a refresh token's grant.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshToken, ScopeSet, TokenSecret, TokenType},
	config::{LifecycleConfig, MAX_ACCESS_TOKEN_LIFETIME},
	error::ConfigError,
};

/// Mints short-lived OAuth access tokens.
#[derive(Clone, Debug)]
pub struct AccessTokenIssuer {
	lifetime: Duration,
	secret_len: usize,
}
impl AccessTokenIssuer {
	/// Creates an issuer producing tokens valid for `lifetime` with `secret_len`-character keys.
	pub fn new(lifetime: Duration, secret_len: usize) -> Self {
		Self { lifetime, secret_len }
	}

	/// Builds an issuer from the lifecycle settings.
	pub fn from_config(config: &LifecycleConfig) -> Self {
		Self::new(config.access_token_lifetime, config.access_secret_len)
	}

	/// Lifetime applied to every minted token.
	pub fn lifetime(&self) -> Duration {
		self.lifetime
	}

	/// Scopes the access token will carry: `requested` when given, otherwise every granted scope.
	///
	/// Fails with [`Error::InvalidScope`] when `requested` names a scope the refresh token was
	/// never granted.
	pub fn effective_scopes(
		refresh: &RefreshToken,
		requested: Option<&ScopeSet>,
	) -> Result<ScopeSet> {
		let Some(requested) = requested else {
			return Ok(refresh.scopes.clone());
		};

		if requested.is_subset_of(&refresh.scopes) {
			Ok(requested.clone())
		} else {
			let excess = requested.difference(&refresh.scopes).collect::<Vec<_>>();

			Err(Error::InvalidScope { reason: format!("not granted: {}", excess.join(", ")) })
		}
	}

	/// Mints an access token for the refresh token's owner.
	///
	/// Fails with [`ConfigError::LifetimeTooLong`] when the lifetime pushes the expiry past the
	/// representable date range.
	pub fn issue(
		&self,
		refresh: &RefreshToken,
		requested: Option<&ScopeSet>,
		issued_at: OffsetDateTime,
	) -> Result<AccessToken> {
		let scopes = Self::effective_scopes(refresh, requested)?;
		let expires_at = issued_at
			.checked_add(self.lifetime)
			.ok_or(ConfigError::LifetimeTooLong { max: MAX_ACCESS_TOKEN_LIFETIME })?;

		Ok(AccessToken {
			owner: refresh.owner.clone(),
			scopes,
			api_key: TokenSecret::generate(self.secret_len),
			token_type: TokenType::OAuth,
			issued_at,
			expires_at,
		})
	}
}
impl Default for AccessTokenIssuer {
	fn default() -> Self {
		Self::from_config(&LifecycleConfig::default())
	}
}
