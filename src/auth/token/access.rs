//! Short-lived access tokens minted by refresh-token exchange.

// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, ScopeSet, TokenSecret},
};

/// Origin marker carried by an access token's API credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
	/// Credential derived from an OAuth refresh-token exchange.
	#[serde(rename = "oauth")]
	OAuth,
}
impl TokenType {
	/// Returns the stable label stored alongside the credential.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenType::OAuth => "oauth",
		}
	}
}
impl Display for TokenType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// API credential bound to an owner and a (possibly narrowed) scope set.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Grant the credential acts on behalf of.
	pub owner: AppUserGrant,
	/// Scopes the credential is authorized for; may be empty.
	pub scopes: ScopeSet,
	/// Opaque API key value.
	pub api_key: TokenSecret,
	/// Credential type marker.
	pub token_type: TokenType,
	/// Instant the credential was minted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the credential is no longer accepted.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns `true` if the credential has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Seconds until expiry as of `instant`, clamped at zero; the `expires_in` of a token response.
	pub fn expires_in(&self, instant: OffsetDateTime) -> i64 {
		(self.expires_at - instant).whole_seconds().max(0)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("owner", &self.owner)
			.field("scopes", &self.scopes)
			.field("api_key", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{AppId, UserId};

	#[test]
	fn token_type_renders_as_oauth() {
		assert_eq!(TokenType::OAuth.to_string(), "oauth");
		assert_eq!(
			serde_json::to_string(&TokenType::OAuth).expect("Token type should serialize."),
			"\"oauth\""
		);
	}

	#[test]
	fn expiry_helpers_follow_expires_at() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken {
			owner: AppUserGrant::new(
				UserId::new("user").expect("User fixture should be valid."),
				AppId::new("app").expect("App fixture should be valid."),
			),
			scopes: ScopeSet::default(),
			api_key: TokenSecret::new("api-key"),
			token_type: TokenType::OAuth,
			issued_at: issued,
			expires_at: issued + Duration::hours(1),
		};

		assert!(!token.is_expired_at(issued));
		assert_eq!(token.expires_in(issued), 3600);
		assert!(token.is_expired_at(issued + Duration::hours(1)));
		assert_eq!(token.expires_in(issued + Duration::hours(2)), 0);
		assert!(!format!("{token:?}").contains("api-key"));
	}
}
