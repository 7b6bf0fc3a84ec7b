//! Crate-level error types shared by the lifecycle, issuer, stores, and configuration.

// self
use crate::{_prelude::*, auth::AppUserGrant};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Scopes cannot back a refresh token.
	#[error(transparent)]
	Validation(#[from] crate::auth::ScopeValidationError),

	/// Refresh token is unknown, stale, or was rotated by a concurrent exchange.
	#[error("Refresh token grant is invalid: {reason}.")]
	InvalidGrant {
		/// Human-readable reason string.
		reason: String,
	},
	/// Requested scopes exceed what the refresh token was granted.
	#[error("Requested scopes are invalid: {reason}.")]
	InvalidScope {
		/// Human-readable reason string.
		reason: String,
	},
	/// The grant already owns a refresh token and the duplicate policy rejects another.
	#[error("Grant {owner} already owns a refresh token.")]
	DuplicateOwner {
		/// Grant that already owns a token.
		owner: AppUserGrant,
	},
}
impl Error {
	/// RFC 6749 §5.2 error code the token endpoint should answer with.
	pub fn oauth_error_code(&self) -> &'static str {
		match self {
			Self::InvalidGrant { .. } => "invalid_grant",
			Self::InvalidScope { .. } | Self::Validation(_) => "invalid_scope",
			Self::DuplicateOwner { .. } => "invalid_request",
			Self::Storage(_) | Self::Config(_) => "server_error",
		}
	}

	pub(crate) fn invalid_grant(reason: impl Into<String>) -> Self {
		Self::InvalidGrant { reason: reason.into() }
	}
}

/// Configuration failures raised while loading or validating [`LifecycleConfig`].
///
/// [`LifecycleConfig`]: crate::config::LifecycleConfig
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	Parse {
		/// Dotted path of the offending field.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Inactivity window must be positive.
	#[error("The inactivity window must be positive.")]
	NonPositiveWindow,
	/// Access token lifetime must be positive.
	#[error("The access token lifetime must be positive.")]
	NonPositiveLifetime,
	/// Access token lifetime would push expiry timestamps out of range.
	#[error("The access token lifetime must not exceed {max}.")]
	LifetimeTooLong {
		/// Longest accepted lifetime.
		max: Duration,
	},
	/// Generated secrets would be too short to resist guessing.
	#[error("Secrets must be at least {min} characters, got {len}.")]
	SecretTooShort {
		/// Configured length.
		len: usize,
		/// Minimum accepted length.
		min: usize,
	},
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}
