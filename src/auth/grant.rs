//! App-user grant ownership (the user/app pair a refresh token belongs to).

// self
use crate::{
	_prelude::*,
	auth::{AppId, GRANT_SEPARATOR, UserId},
};

/// Authorization a user granted to an application; owns at most one refresh token.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppUserGrant {
	/// User who authorized the application.
	pub user: UserId,
	/// Application the user authorized.
	pub app: AppId,
}
impl AppUserGrant {
	/// Creates a grant for the provided user and application.
	pub fn new(user: UserId, app: AppId) -> Self {
		Self { user, app }
	}
}
impl Display for AppUserGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}{GRANT_SEPARATOR}{}", self.user, self.app)
	}
}
