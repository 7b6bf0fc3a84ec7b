// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for exchange attempts and their rejection causes.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	stale: AtomicU64,
	scope_rejections: AtomicU64,
	rotation_conflicts: AtomicU64,
}
impl ExchangeMetrics {
	/// Returns the total number of exchange attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of successful exchanges.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed exchanges, whatever the cause.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges refused because the token went stale.
	pub fn stale_rejections(&self) -> u64 {
		self.stale.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges refused for requesting ungranted scopes.
	pub fn scope_rejections(&self) -> u64 {
		self.scope_rejections.load(Ordering::Relaxed)
	}

	/// Returns the number of exchanges that lost a rotation race.
	pub fn rotation_conflicts(&self) -> u64 {
		self.rotation_conflicts.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale(&self) {
		self.stale.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_scope_rejection(&self) {
		self.scope_rejections.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rotation_conflict(&self) {
		self.rotation_conflicts.fetch_add(1, Ordering::Relaxed);
	}
}
