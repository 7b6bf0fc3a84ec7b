//! Scope sets, the recognized scope vocabulary, and refresh-token scope validation.

// std
use std::{cmp::Ordering, collections::BTreeSet, slice::Iter};
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Scope every refresh token must carry; marks non-interactive, refresh-eligible access.
pub const OFFLINE_SCOPE: &str = "offline";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
	/// The set lacks the `offline` scope required by refresh tokens.
	#[error("Scopes must contain `offline`.")]
	MissingRequiredScope,
	/// The set contains entries outside the recognized vocabulary.
	#[error("Scopes contain unsupported scopes: {}.", .scopes.join(", "))]
	UnsupportedScopes {
		/// Every unrecognized entry, in normalized order.
		scopes: Vec<String>,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so equality, ordering, and hashing stay consistent no
/// matter how callers spelled the original list.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)? })
	}

	/// Scope set holding only [`OFFLINE_SCOPE`].
	pub fn offline() -> Self {
		Self { scopes: Arc::from(vec![OFFLINE_SCOPE.to_owned()]) }
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Returns true when every scope in `self` is also present in `granted`.
	///
	/// The empty set is a subset of every set.
	pub fn is_subset_of(&self, granted: &ScopeSet) -> bool {
		self.iter().all(|scope| granted.contains(scope))
	}

	/// Scopes in `self` that `granted` does not contain.
	pub fn difference<'a>(&'a self, granted: &'a ScopeSet) -> impl Iterator<Item = &'a str> {
		self.iter().filter(|scope| !granted.contains(scope))
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Returns the normalized string representation (space-delimited).
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}
}
impl PartialOrd for ScopeSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ScopeSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.scopes.cmp(&other.scopes)
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

/// Globally recognized scope vocabulary.
///
/// Always recognizes [`OFFLINE_SCOPE`]. Capability scopes are registered either as exact names
/// or as prefixes, the latter covering parameterized scopes such as `datasets:r:<table>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeVocabulary {
	/// Exact capability scope names.
	#[serde(default)]
	pub scopes: BTreeSet<String>,
	/// Prefixes that recognize every scope starting with them.
	#[serde(default)]
	pub prefixes: BTreeSet<String>,
}
impl ScopeVocabulary {
	/// Creates a vocabulary recognizing `offline` plus the provided capability scopes.
	pub fn new<I, S>(scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { scopes: scopes.into_iter().map(Into::into).collect(), prefixes: BTreeSet::new() }
	}

	/// Registers an additional exact capability scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.insert(scope.into());

		self
	}

	/// Registers a prefix; every scope starting with it becomes recognized.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefixes.insert(prefix.into());

		self
	}

	/// Returns true if the scope belongs to the vocabulary.
	pub fn recognizes(&self, scope: &str) -> bool {
		scope == OFFLINE_SCOPE
			|| self.scopes.contains(scope)
			|| self
				.prefixes
				.iter()
				.any(|prefix| !prefix.is_empty() && scope.starts_with(prefix.as_str()))
	}

	/// Validates the scopes granted to a refresh token.
	///
	/// Unsupported entries are collected in a single pass so the error names all of them, and
	/// they are reported ahead of a missing `offline` scope.
	pub fn validate(&self, scopes: &ScopeSet) -> Result<(), ScopeValidationError> {
		let unsupported = scopes
			.iter()
			.filter(|scope| !self.recognizes(scope))
			.map(str::to_owned)
			.collect::<Vec<_>>();

		if !unsupported.is_empty() {
			return Err(ScopeValidationError::UnsupportedScopes { scopes: unsupported });
		}
		if !scopes.contains(OFFLINE_SCOPE) {
			return Err(ScopeValidationError::MissingRequiredScope);
		}

		Ok(())
	}
}
impl Default for ScopeVocabulary {
	fn default() -> Self {
		Self::new(Vec::<String>::new())
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}
