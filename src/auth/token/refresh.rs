//! Refresh token records, inactivity status, rotation, and the validating builder.

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, ScopeSet, ScopeValidationError, ScopeVocabulary, TokenSecret},
};

/// Default length of generated refresh secrets.
pub const DEFAULT_SECRET_LEN: usize = 64;

/// Liveness of a persisted refresh token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshTokenStatus {
	/// Last activity lies within the inactivity window; the token can be exchanged.
	Fresh,
	/// Last activity is older than the inactivity window; the grant must be re-authorized.
	Stale,
}

/// Long-lived credential owned by a single app-user grant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
	/// Grant that owns this token.
	pub owner: AppUserGrant,
	/// Opaque secret presented by clients; regenerated on every rotation.
	pub token: TokenSecret,
	/// Normalized scopes granted to the token; always include `offline`.
	pub scopes: ScopeSet,
	/// Instant the grant first produced this token.
	pub created_at: OffsetDateTime,
	/// Last-activity instant; reset on every successful exchange.
	pub updated_at: OffsetDateTime,
}
impl RefreshToken {
	/// Returns a builder for the provided owner and scopes.
	pub fn builder(owner: AppUserGrant, scopes: ScopeSet) -> RefreshTokenBuilder {
		RefreshTokenBuilder::new(owner, scopes)
	}

	/// Time elapsed since the last activity.
	pub fn idle_for(&self, instant: OffsetDateTime) -> Duration {
		instant - self.updated_at
	}

	/// Computes the liveness status at `instant` for the given inactivity window.
	///
	/// A token idle for exactly `window` is still fresh.
	pub fn status_at(&self, instant: OffsetDateTime, window: Duration) -> RefreshTokenStatus {
		if self.idle_for(instant) > window {
			RefreshTokenStatus::Stale
		} else {
			RefreshTokenStatus::Fresh
		}
	}

	/// Returns `true` if the token is stale at `instant`.
	pub fn is_stale_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		matches!(self.status_at(instant, window), RefreshTokenStatus::Stale)
	}

	/// Produces the rotated successor: new secret and activity instant, same owner and scopes.
	pub fn rotated(&self, token: TokenSecret, instant: OffsetDateTime) -> Self {
		Self {
			owner: self.owner.clone(),
			token,
			scopes: self.scopes.clone(),
			created_at: self.created_at,
			updated_at: instant,
		}
	}
}
impl Debug for RefreshToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshToken")
			.field("owner", &self.owner)
			.field("token", &"<redacted>")
			.field("scopes", &self.scopes)
			.field("created_at", &self.created_at)
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

/// Builder for [`RefreshToken`]; validation runs in [`RefreshTokenBuilder::build`].
#[derive(Clone, Debug)]
pub struct RefreshTokenBuilder {
	owner: AppUserGrant,
	scopes: ScopeSet,
	token: Option<TokenSecret>,
	secret_len: usize,
	created_at: Option<OffsetDateTime>,
	updated_at: Option<OffsetDateTime>,
}
impl RefreshTokenBuilder {
	fn new(owner: AppUserGrant, scopes: ScopeSet) -> Self {
		Self {
			owner,
			scopes,
			token: None,
			secret_len: DEFAULT_SECRET_LEN,
			created_at: None,
			updated_at: None,
		}
	}

	/// Uses a caller-provided secret instead of generating one.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TokenSecret::new(token));

		self
	}

	/// Length of the generated secret when none is provided.
	pub fn secret_len(mut self, len: usize) -> Self {
		self.secret_len = len;

		self
	}

	/// Stamps both the creation and the last-activity instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.created_at = Some(instant);
		self.updated_at = Some(instant);

		self
	}

	/// Overrides the last-activity instant.
	pub fn updated_at(mut self, instant: OffsetDateTime) -> Self {
		self.updated_at = Some(instant);

		self
	}

	/// Validates scopes against `vocabulary` and produces a [`RefreshToken`].
	pub fn build(
		self,
		vocabulary: &ScopeVocabulary,
	) -> Result<RefreshToken, ScopeValidationError> {
		vocabulary.validate(&self.scopes)?;

		let created_at = self.created_at.unwrap_or_else(OffsetDateTime::now_utc);
		let updated_at = self.updated_at.unwrap_or(created_at);
		let token = self.token.unwrap_or_else(|| TokenSecret::generate(self.secret_len));

		Ok(RefreshToken { owner: self.owner, token, scopes: self.scopes, created_at, updated_at })
	}
}
