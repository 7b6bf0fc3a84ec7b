//! Auth-domain identifiers, grants, scope sets, and token models.

pub mod grant;
pub mod id;
pub mod scope;
pub mod token;

pub use grant::*;
pub use id::*;
pub use scope::*;
pub use token::{access::*, refresh::*, secret::*};
