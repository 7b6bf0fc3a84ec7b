//! Validated identifiers for the two parties of a grant: the user who consented and the
//! application acting on their behalf.
//!
//! Both end up inside [`AppUserGrant`](crate::auth::AppUserGrant), which renders as
//! `user@app` in logs and error messages, so neither side may contain the `@` separator.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident => $kind:expr) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Which party of a grant this identifier names.
			pub const KIND: IdentifierKind = $kind;

			/// Validates `value` and wraps it.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				Self::KIND.check(view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::KIND.check(&value)?;

				Ok(Self(value))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", Self::KIND, self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Separator between the user and app halves of a rendered grant.
pub const GRANT_SEPARATOR: char = '@';

const IDENTIFIER_MAX_LEN: usize = 128;

/// Party of a grant an identifier refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
	/// The end user who consented.
	User,
	/// The registered application holding the grant.
	App,
}
impl IdentifierKind {
	fn check(self, view: &str) -> Result<(), IdentifierError> {
		if view.is_empty() {
			return Err(IdentifierError::Empty { kind: self });
		}
		if view.chars().any(char::is_whitespace) {
			return Err(IdentifierError::ContainsWhitespace { kind: self });
		}
		if view.contains(GRANT_SEPARATOR) {
			return Err(IdentifierError::ContainsSeparator { kind: self });
		}
		if view.len() > IDENTIFIER_MAX_LEN {
			return Err(IdentifierError::TooLong { kind: self, max: IDENTIFIER_MAX_LEN });
		}

		Ok(())
	}
}
impl Display for IdentifierKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::User => "User",
			Self::App => "App",
		})
	}
}

/// Why a user or app identifier was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Party the identifier was meant for.
		kind: IdentifierKind,
	},
	/// Whitespace anywhere in the value; padded ids from form input are not trimmed silently.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Party the identifier was meant for.
		kind: IdentifierKind,
	},
	/// The value contains the grant separator.
	#[error("{kind} identifier must not contain `@`.")]
	ContainsSeparator {
		/// Party the identifier was meant for.
		kind: IdentifierKind,
	},
	/// Longer than the store accepts.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Party the identifier was meant for.
		kind: IdentifierKind,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

def_id! {
	/// Account that authorized an application; one half of a grant.
	UserId => IdentifierKind::User
}
def_id! {
	/// OAuth application registered to request tokens; the other half of a grant.
	AppId => IdentifierKind::App
}
