//! Single-flight refresh guard.
//!
//! The guard is an async mutex plus a generation counter. The mutex keeps at most one refresh
//! call in flight; the counter lets a request that failed with an older token tell whether a
//! refresh cycle completed since it was sent, in which case it re-sends instead of refreshing
//! again. The counter is bumped before the mutex unlocks, so waiters always observe the
//! session update the refresher made.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use async_lock::MutexGuard;
// self
use crate::_prelude::*;

/// Unlocked/Locked refresh lock shared by every clone of a pipeline.
#[derive(Debug, Default)]
pub struct RefreshGuard {
	lock: AsyncMutex<()>,
	generation: AtomicU64,
}
impl RefreshGuard {
	/// Number of completed refresh cycles.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Parks until no refresh is in flight.
	pub async fn wait_unlocked(&self) {
		drop(self.lock.lock().await);
	}

	/// Acquires the guard; the flag reports whether another holder had to be waited for.
	pub async fn acquire(&self) -> (RefreshPermit<'_>, bool) {
		if let Some(lock) = self.lock.try_lock() {
			return (RefreshPermit::new(self, lock), false);
		}

		let lock = self.lock.lock().await;

		(RefreshPermit::new(self, lock), true)
	}
}

/// Exclusive hold on a [`RefreshGuard`]; dropping it unlocks the guard.
pub struct RefreshPermit<'a> {
	guard: &'a RefreshGuard,
	completed: bool,
	_lock: MutexGuard<'a, ()>,
}
impl<'a> RefreshPermit<'a> {
	fn new(guard: &'a RefreshGuard, lock: MutexGuard<'a, ()>) -> Self {
		Self { guard, completed: false, _lock: lock }
	}

	/// Returns `true` when a refresh cycle completed after generation `seen` was observed.
	pub fn is_stale(&self, seen: u64) -> bool {
		self.guard.generation() != seen
	}

	/// Marks this hold as a completed refresh cycle; the generation advances on release.
	pub fn complete(&mut self) {
		self.completed = true;
	}
}
impl Drop for RefreshPermit<'_> {
	fn drop(&mut self) {
		// Runs before `_lock` is dropped: the bump is visible to the next holder.
		if self.completed {
			self.guard.generation.fetch_add(1, Ordering::AcqRel);
		}
	}
}
impl Debug for RefreshPermit<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshPermit").field("completed", &self.completed).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn completed_permit_advances_generation_on_release() {
		let guard = RefreshGuard::default();
		let seen = guard.generation();

		{
			let (mut permit, waited) = guard.acquire().await;

			assert!(!waited);
			assert!(!permit.is_stale(seen));

			permit.complete();
		}

		assert_eq!(guard.generation(), seen + 1);

		let (permit, _) = guard.acquire().await;

		assert!(permit.is_stale(seen));
	}

	#[tokio::test]
	async fn abandoned_permit_keeps_generation() {
		let guard = RefreshGuard::default();

		drop(guard.acquire().await);

		assert_eq!(guard.generation(), 0);
	}

	#[tokio::test]
	async fn second_acquirer_waits_for_release() {
		let guard = Arc::new(RefreshGuard::default());
		let (mut permit, _) = guard.acquire().await;
		let contender = {
			let guard = guard.clone();

			tokio::spawn(async move {
				let (permit, waited) = guard.acquire().await;

				(waited, permit.is_stale(0))
			})
		};

		tokio::time::sleep(StdDuration::from_millis(20)).await;
		permit.complete();
		drop(permit);

		let (waited, stale) = contender.await.expect("Contender task should not panic.");

		assert!(waited);
		assert!(stale);
	}
}
