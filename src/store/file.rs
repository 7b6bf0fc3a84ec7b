//! File-backed [`RefreshTokenStore`] for lightweight deployments.
//!
//! Several handles, in one process or many, may share a snapshot path. Every operation takes an
//! advisory lock on a sibling `.lock` file and reads the snapshot from disk under it, so no
//! handle acts on a stale view of the table.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use fs4::fs_std::FileExt;
// self
use crate::{
	_prelude::*,
	auth::{AppUserGrant, RefreshToken},
	store::{
		CompareAndSwapOutcome, DuplicatePolicy, InsertOutcome, RefreshTokenStore, StoreError,
		StoreFuture, TokenTable,
	},
};

/// Persists refresh tokens to a JSON file after each mutation.
///
/// Reads hold a shared lock and mutations an exclusive one for the whole
/// load-modify-persist cycle. The snapshot is replaced via rename, so a failed write leaves the
/// previous snapshot in place.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	lock_path: PathBuf,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, checking that existing data parses.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let mut lock_path = path.clone();

		lock_path.set_extension("lock");

		let store = Self { path, lock_path };

		store.read(|_| ())?;

		Ok(store)
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<TokenTable, StoreError> {
		if !path.exists() {
			return Ok(TokenTable::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(TokenTable::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let tokens = serde_json::from_slice::<Vec<RefreshToken>>(&bytes).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to parse {}: {e}", path.display()) }
		})?;

		TokenTable::from_tokens(tokens)
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	/// Blocks until the snapshot lock is held; it is released when the returned file drops.
	fn lock(&self, exclusive: bool) -> Result<File, StoreError> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(&self.lock_path)
			.map_err(|e| StoreError::Backend {
				message: format!("Failed to open {}: {e}", self.lock_path.display()),
			})?;
		let locked =
			if exclusive { FileExt::lock_exclusive(&file) } else { FileExt::lock_shared(&file) };

		locked.map_err(|e| StoreError::Backend {
			message: format!("Failed to lock {}: {e}", self.lock_path.display()),
		})?;

		Ok(file)
	}

	fn persist(&self, table: &TokenTable) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut snapshot = table.tokens().collect::<Vec<_>>();

		snapshot.sort_by(|a, b| a.owner.cmp(&b.owner));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn read<T>(&self, view: impl FnOnce(&TokenTable) -> T) -> Result<T, StoreError> {
		let _lock = self.lock(false)?;

		Ok(view(&Self::load_snapshot(&self.path)?))
	}

	/// Runs `mutation` on the on-disk table; persists it when the mutation reports a change.
	fn mutate<T>(
		&self,
		mutation: impl FnOnce(&mut TokenTable) -> Result<(T, bool), StoreError>,
	) -> Result<T, StoreError> {
		let _lock = self.lock(true)?;
		let mut table = Self::load_snapshot(&self.path)?;
		let (value, changed) = mutation(&mut table)?;

		if changed {
			self.persist(&table)?;
		}

		Ok(value)
	}
}
impl RefreshTokenStore for FileStore {
	fn insert_unique(
		&self,
		token: RefreshToken,
		policy: DuplicatePolicy,
	) -> StoreFuture<'_, InsertOutcome> {
		Box::pin(async move {
			self.mutate(|table| {
				let outcome = table.insert_unique(token, policy)?;
				let changed =
					matches!(outcome, InsertOutcome::Inserted | InsertOutcome::Replaced { .. });

				Ok((outcome, changed))
			})
		})
	}

	fn fetch_by_owner<'a>(
		&'a self,
		owner: &'a AppUserGrant,
	) -> StoreFuture<'a, Option<RefreshToken>> {
		Box::pin(async move { self.read(|table| table.fetch_by_owner(owner)) })
	}

	fn fetch_by_secret<'a>(&'a self, secret: &'a str) -> StoreFuture<'a, Option<RefreshToken>> {
		Box::pin(async move { self.read(|table| table.fetch_by_secret(secret)) })
	}

	fn compare_and_swap<'a>(
		&'a self,
		owner: &'a AppUserGrant,
		expected_secret: &'a str,
		replacement: RefreshToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.mutate(|table| {
				let outcome = table.compare_and_swap(owner, expected_secret, replacement)?;

				Ok((outcome, matches!(outcome, CompareAndSwapOutcome::Updated)))
			})
		})
	}

	fn destroy<'a>(&'a self, owner: &'a AppUserGrant) -> StoreFuture<'a, Option<RefreshToken>> {
		Box::pin(async move {
			self.mutate(|table| {
				let removed = table.destroy(owner);
				let changed = removed.is_some();

				Ok((removed, changed))
			})
		})
	}

	fn count(&self) -> StoreFuture<'_, usize> {
		Box::pin(async move { self.read(TokenTable::len) })
	}
}
