//! Lifecycle configuration: inactivity window, access-token lifetime, secrets, and vocabulary.

// self
use crate::{_prelude::*, auth::ScopeVocabulary, error::ConfigError, store::DuplicatePolicy};

/// Average Gregorian month (one twelfth of 365.2425 days).
pub const MONTH: Duration = Duration::seconds(2_629_746);

/// Longest access-token lifetime [`LifecycleConfig::validate`] accepts.
pub const MAX_ACCESS_TOKEN_LIFETIME: Duration = Duration::days(366);

const MIN_SECRET_LEN: usize = 32;

/// Settings shared by every lifecycle operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
	/// Maximum idle time between two exchanges before a refresh token goes stale.
	pub inactivity_window: Duration,
	/// Lifetime of minted access tokens.
	pub access_token_lifetime: Duration,
	/// Length of generated refresh secrets.
	pub refresh_secret_len: usize,
	/// Length of generated access-token API keys.
	pub access_secret_len: usize,
	/// Behavior when a grant already owns a refresh token.
	pub duplicate_policy: DuplicatePolicy,
	/// Recognized scope vocabulary.
	pub vocabulary: ScopeVocabulary,
}
impl LifecycleConfig {
	/// Parses a JSON document, reporting the path of the first malformed field.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let deserializer = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(deserializer)?;

		config.validate()?;

		Ok(config)
	}

	/// Checks the invariants the lifecycle relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.inactivity_window.is_positive() {
			return Err(ConfigError::NonPositiveWindow);
		}
		if !self.access_token_lifetime.is_positive() {
			return Err(ConfigError::NonPositiveLifetime);
		}
		if self.access_token_lifetime > MAX_ACCESS_TOKEN_LIFETIME {
			return Err(ConfigError::LifetimeTooLong { max: MAX_ACCESS_TOKEN_LIFETIME });
		}

		for len in [self.refresh_secret_len, self.access_secret_len] {
			if len < MIN_SECRET_LEN {
				return Err(ConfigError::SecretTooShort { len, min: MIN_SECRET_LEN });
			}
		}

		Ok(())
	}

	/// Overrides the inactivity window (defaults to six months).
	pub fn with_inactivity_window(mut self, window: Duration) -> Self {
		self.inactivity_window = window;

		self
	}

	/// Overrides the access-token lifetime (defaults to one hour).
	pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
		self.access_token_lifetime = lifetime;

		self
	}

	/// Overrides the duplicate-owner policy.
	pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
		self.duplicate_policy = policy;

		self
	}

	/// Replaces the recognized scope vocabulary.
	pub fn with_vocabulary(mut self, vocabulary: ScopeVocabulary) -> Self {
		self.vocabulary = vocabulary;

		self
	}
}
impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			inactivity_window: MONTH * 6,
			access_token_lifetime: Duration::hours(1),
			refresh_secret_len: crate::auth::DEFAULT_SECRET_LEN,
			access_secret_len: crate::auth::DEFAULT_SECRET_LEN,
			duplicate_policy: DuplicatePolicy::default(),
			vocabulary: ScopeVocabulary::default(),
		}
	}
}
