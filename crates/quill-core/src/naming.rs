//! # Stored Artifact Naming
//!
//! Stored filenames have the shape `{stamp}-{sanitized}`. The sanitized part
//! keeps `[A-Za-z0-9.-]` and replaces every other character with `_`, so
//! the result is safe both as a path segment and in a URL. The stamp comes
//! from an injected [`UploadStamp`] generator, which gives uniqueness and
//! chronological ordering without any process-global counter.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Name used when the client sent no original filename.
pub const DEFAULT_ORIGINAL_NAME: &str = "upload.bin";

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
///
/// One output character per input character, so multi-byte characters
/// collapse to a single underscore. Idempotent.
pub fn sanitize_file_name(original: &str) -> String {
    original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A derived, filesystem-safe stored filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredName(String);

impl StoredName {
    /// Derive the stored name from a stamp and the client's original name.
    pub fn derive(stamp: u64, original_name: &str) -> Self {
        Self(format!("{stamp}-{}", sanitize_file_name(original_name)))
    }

    /// The filename as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoredName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the integer prefix on stored filenames.
pub trait UploadStamp: Send + Sync {
    /// Produce the next stamp. Successive calls on one generator never
    /// return the same value.
    fn next_stamp(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch, bumped to stay strictly
/// increasing when two uploads land in the same millisecond.
#[derive(Debug, Default)]
pub struct MonotonicMillis {
    last: AtomicU64,
}

impl MonotonicMillis {
    /// Create a generator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    fn now_millis() -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

impl UploadStamp for MonotonicMillis {
    fn next_stamp(&self) -> u64 {
        let now = Self::now_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Deterministic stamps for tests and offline tooling: hands out the
/// queued values in order, then keeps counting up from the last one.
#[derive(Debug)]
pub struct FixedStamps {
    state: Mutex<(Vec<u64>, u64)>,
}

impl FixedStamps {
    /// Queue the given stamps; they are returned in the order supplied.
    pub fn new(stamps: impl IntoIterator<Item = u64>) -> Self {
        let mut queued: Vec<u64> = stamps.into_iter().collect();
        queued.reverse();
        Self {
            state: Mutex::new((queued, 0)),
        }
    }

    /// Count up from `start`.
    pub fn starting_at(start: u64) -> Self {
        Self::new([start])
    }
}

impl UploadStamp for FixedStamps {
    fn next_stamp(&self) -> u64 {
        let mut guard = self.state.lock();
        let (queued, last) = &mut *guard;
        let next = queued.pop().unwrap_or(*last + 1);
        *last = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_file_name("my photo!.png"), "my_photo_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("café.webp"), "caf_.webp");
    }

    #[test]
    fn stored_name_shape() {
        let name = StoredName::derive(1_700_000_000_123, "my photo!.png");
        assert_eq!(name.as_str(), "1700000000123-my_photo_.png");
    }

    #[test]
    fn monotonic_never_repeats() {
        let stamps = MonotonicMillis::new();
        let mut prev = stamps.next_stamp();
        for _ in 0..1000 {
            let next = stamps.next_stamp();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn monotonic_unique_across_threads() {
        let stamps = Arc::new(MonotonicMillis::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stamps = Arc::clone(&stamps);
                std::thread::spawn(move || (0..250).map(|_| stamps.next_stamp()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for s in h.join().unwrap() {
                assert!(seen.insert(s), "duplicate stamp {s}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn identical_names_in_same_window_do_not_collide() {
        let stamps = MonotonicMillis::new();
        let a = StoredName::derive(stamps.next_stamp(), "cover.png");
        let b = StoredName::derive(stamps.next_stamp(), "cover.png");
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_stamps_replay_then_count() {
        let stamps = FixedStamps::new([5, 9]);
        assert_eq!(stamps.next_stamp(), 5);
        assert_eq!(stamps.next_stamp(), 9);
        assert_eq!(stamps.next_stamp(), 10);
    }

    proptest! {
        #[test]
        fn sanitize_is_total_and_idempotent(name in "\\PC{0,64}") {
            let once = sanitize_file_name(&name);
            prop_assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'));
            prop_assert_eq!(once.chars().count(), name.chars().count());
            prop_assert_eq!(sanitize_file_name(&once), once);
        }
    }
}
