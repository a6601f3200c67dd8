//! Deadline persistence
//!
//! A store maps timer keys to absolute deadlines. Keys are independent: two
//! countdowns under different keys never see each other's deadline.

pub mod file_store;
pub mod memory_store;
pub mod record;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    state::{CountdownDuration, Deadline},
};

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use record::{parse_record, DeadlineRecord};

/// Key-partitioned deadline storage
///
/// Implementors provide raw `load`/`save`/`remove`; `load` must return `None`
/// for missing or unreadable entries rather than failing.
pub trait DeadlineStore: Send + Sync {
    fn load(&self, key: &str) -> Option<Deadline>;

    fn save(&self, key: &str, deadline: Deadline) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Return the stored deadline for `key`, or start a new one
    ///
    /// A deadline at or before `now` counts as absent. A new deadline is
    /// persisted before it is returned; if that write fails the deadline is
    /// still returned for the current mount.
    fn get_or_create(
        &self,
        key: &str,
        duration: CountdownDuration,
        now: DateTime<Utc>,
    ) -> Deadline {
        if let Some(existing) = self.load(key) {
            if !existing.is_past(now) {
                debug!("Resuming timer {} with deadline {}", key, existing.deadline_at());
                return existing;
            }
            debug!("Stored deadline for {} has passed, starting a new window", key);
        }

        let deadline = Deadline::starting_at(now, duration);
        if let Err(e) = self.save(key, deadline) {
            warn!("Failed to persist deadline for {}: {}", key, e);
        }
        info!(
            "Created deadline for {} at {} ({}s window)",
            key,
            deadline.deadline_at(),
            duration.as_secs()
        );
        deadline
    }

    /// Forget the deadline for `key` so the next mount starts fresh
    fn clear(&self, key: &str) {
        match self.remove(key) {
            Ok(()) => debug!("Cleared deadline for {}", key),
            Err(e) => warn!("Failed to clear deadline for {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CountdownError;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Remembers nothing and refuses every write
    #[derive(Default)]
    struct ReadOnlyStore {
        writes: AtomicUsize,
    }

    impl DeadlineStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> Option<Deadline> {
            None
        }

        fn save(&self, _key: &str, _deadline: Deadline) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CountdownError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CountdownError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: u64) -> CountdownDuration {
        CountdownDuration::from_secs(n).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent_within_window() {
        let store = MemoryStore::new();
        let first = store.get_or_create("t", secs(7200), t0());
        let second = store.get_or_create("t", secs(7200), t0() + Duration::seconds(10));

        assert_eq!(first, second);
        assert_eq!(first.epoch_millis(), t0().timestamp_millis() + 7_200_000);
    }

    #[test]
    fn expired_deadline_is_replaced() {
        let store = MemoryStore::new();
        let first = store.get_or_create("t", secs(60), t0());
        let later = t0() + Duration::seconds(61);
        let second = store.get_or_create("t", secs(60), later);

        assert_ne!(first, second);
        assert_eq!(second, Deadline::starting_at(later, secs(60)));
        assert_eq!(store.load("t"), Some(second));
    }

    #[test]
    fn deadline_exactly_now_is_replaced() {
        let store = MemoryStore::new();
        store.get_or_create("t", secs(60), t0());
        let at_deadline = t0() + Duration::seconds(60);
        let renewed = store.get_or_create("t", secs(60), at_deadline);

        assert_eq!(renewed.remaining_seconds(at_deadline), 60);
    }

    #[test]
    fn clear_forces_a_new_window() {
        let store = MemoryStore::new();
        let first = store.get_or_create("t", secs(7200), t0());
        store.clear("t");
        let now = t0() + Duration::seconds(30);
        let second = store.get_or_create("t", secs(7200), now);

        assert_ne!(first, second);
        assert_eq!(second, Deadline::starting_at(now, secs(7200)));
    }

    #[test]
    fn failed_write_still_returns_deadline() {
        let store = ReadOnlyStore::default();
        let deadline = store.get_or_create("t", secs(7200), t0());

        assert_eq!(deadline, Deadline::starting_at(t0(), secs(7200)));
        assert_eq!(deadline.remaining_seconds(t0()), 7200);

        store.clear("t");
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keys_do_not_collide() {
        let store = MemoryStore::new();
        let a = store.get_or_create("A", secs(7200), t0());
        let b = store.get_or_create("B", secs(86_400), t0());

        assert_ne!(a, b);
        assert_eq!(store.get_or_create("A", secs(10), t0()), a);
        assert_eq!(store.get_or_create("B", secs(10), t0()), b);

        store.clear("A");
        assert_eq!(store.load("A"), None);
        assert_eq!(store.load("B"), Some(b));
    }
}
