//! Striped per-path locks.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A fixed table of async mutexes keyed by path hash.
///
/// Distinct paths may share a stripe; holding a guard only guarantees that no
/// other holder of the same stripe runs concurrently.
#[derive(Debug, Clone)]
pub struct PathLocks {
    stripes: Arc<[Arc<Mutex<()>>]>,
}

/// Guard returned by [`PathLocks::lock`].
pub type PathLockGuard = OwnedMutexGuard<()>;

impl PathLocks {
    /// Creates a lock table with `stripes` mutexes (at least one).
    pub fn new(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1))
            .map(|_| Arc::new(Mutex::new(())))
            .collect();

        Self { stripes }
    }

    /// Returns the number of stripes.
    pub fn stripes(&self) -> usize {
        self.stripes.len()
    }

    /// Waits for the stripe that guards `path`.
    pub async fn lock(&self, path: &Path) -> PathLockGuard {
        let stripe = self.stripe_of(path);
        Arc::clone(&self.stripes[stripe]).lock_owned().await
    }

    fn stripe_of(&self, path: &Path) -> usize {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_stripes_is_clamped() {
        assert_eq!(PathLocks::new(0).stripes(), 1);
    }

    #[test]
    fn same_path_maps_to_same_stripe() {
        let locks = PathLocks::new(16);
        let path = Path::new("/content/docs");
        assert_eq!(locks.stripe_of(path), locks.stripe_of(path));
    }

    #[tokio::test]
    async fn lock_excludes_concurrent_holders() {
        let locks = PathLocks::new(4);
        let path = Path::new("/content/docs");

        let guard = locks.lock(path).await;
        let contended = tokio::time::timeout(Duration::from_millis(20), locks.lock(path)).await;
        assert!(contended.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(200), locks.lock(path)).await;
        assert!(reacquired.is_ok());
    }
}
