//! OAuth 2.0 refresh-token lifecycle: single-token grants, inactivity expiry, scope-narrowing
//! exchanges, and CAS-safe rotation over pluggable stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod issuer;
pub mod lifecycle;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use time::macros;
	// self
	use crate::{
		auth::{AppId, AppUserGrant, UserId},
		clock::ManualClock,
		config::LifecycleConfig,
		lifecycle::RefreshTokenLifecycle,
		store::{MemoryStore, RefreshTokenStore},
	};

	/// Instant every test clock starts at.
	pub const TEST_EPOCH: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	/// Builds the grant owned by `user` on `app`.
	pub fn test_grant(user: &str, app: &str) -> AppUserGrant {
		AppUserGrant::new(
			UserId::new(user).expect("Failed to build user fixture."),
			AppId::new(app).expect("Failed to build app fixture."),
		)
	}

	/// Constructs a [`RefreshTokenLifecycle`] backed by an in-memory store and a manual clock
	/// frozen at [`TEST_EPOCH`].
	pub fn build_test_lifecycle(
		config: LifecycleConfig,
	) -> (RefreshTokenLifecycle, Arc<MemoryStore>, ManualClock) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn RefreshTokenStore> = store_backend.clone();
		let clock = ManualClock::new(TEST_EPOCH);
		let lifecycle = RefreshTokenLifecycle::new(store, config)
			.expect("Failed to build lifecycle from test configuration.")
			.with_clock(Arc::new(clock.clone()));

		(lifecycle, store_backend, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}
