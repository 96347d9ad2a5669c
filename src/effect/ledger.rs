//! Bookkeeping for in-flight cancellable effects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Cancellation bucket an effect handle lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Bucket {
    /// Effects registered under an explicit identity; targets of
    /// [`Effect::cancel`](crate::effect::Effect::cancel).
    Named(String),
    /// Effects without an identity. Not selectively cancellable, but still
    /// cancelled on store teardown.
    Anonymous,
}

impl Bucket {
    fn from_id(id: Option<&str>) -> Self {
        match id {
            Some(id) => Bucket::Named(id.to_owned()),
            None => Bucket::Anonymous,
        }
    }
}

/// Registration receipt for one in-flight effect. The owning task cancels
/// through `token` and must hand `bucket`/`handle` back to
/// [`CancellationLedger::unregister`] when it finishes.
pub(crate) struct LedgerEntry {
    pub(crate) bucket: Bucket,
    pub(crate) handle: u64,
    pub(crate) token: CancellationToken,
}

/// Per-store map from cancellation bucket to outstanding cancel handles.
///
/// Every operation tolerates absent buckets and unknown handles: several code
/// paths may race to cancel the same identity, and a finished task may
/// unregister itself concurrently with a new registration under the same id.
/// Handles are keyed by a unique number so a stale unregistration can never
/// remove a successor's token.
#[derive(Default)]
pub(crate) struct CancellationLedger {
    entries: Mutex<HashMap<Bucket, HashMap<u64, CancellationToken>>>,
    next_handle: AtomicU64,
}

impl CancellationLedger {
    /// Insert a fresh handle under `id` (or the anonymous bucket).
    pub(crate) fn register(&self, id: Option<&str>) -> LedgerEntry {
        let bucket = Bucket::from_id(id);
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.entries
            .lock()
            .entry(bucket.clone())
            .or_default()
            .insert(handle, token.clone());
        LedgerEntry {
            bucket,
            handle,
            token,
        }
    }

    /// Cancel and forget every handle registered under `id`. No-op when the
    /// identity has nothing in flight.
    pub(crate) fn cancel_all(&self, id: &str) {
        let removed = self.entries.lock().remove(&Bucket::Named(id.to_owned()));
        if let Some(handles) = removed {
            tracing::debug!(id, count = handles.len(), "cancelling in-flight effects");
            for token in handles.into_values() {
                token.cancel();
            }
        }
    }

    /// Remove one handle; the bucket is dropped once empty so the anonymous
    /// bucket doesn't grow without bound. Unknown handles are no-ops.
    pub(crate) fn unregister(&self, bucket: &Bucket, handle: u64) {
        let mut entries = self.entries.lock();
        if let Some(handles) = entries.get_mut(bucket) {
            handles.remove(&handle);
            if handles.is_empty() {
                entries.remove(bucket);
            }
        }
    }

    /// Cancel everything, named and anonymous. Store teardown.
    pub(crate) fn cancel_everything(&self) {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        for (_, handles) in drained {
            for token in handles.into_values() {
                token.cancel();
            }
        }
    }

    /// Number of outstanding handles across all buckets.
    pub(crate) fn outstanding(&self) -> usize {
        self.entries.lock().values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister_round_trip() {
        let ledger = CancellationLedger::default();
        let entry = ledger.register(Some("io"));
        assert_eq!(ledger.outstanding(), 1);

        ledger.unregister(&entry.bucket, entry.handle);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn cancel_all_cancels_every_handle_under_id() {
        let ledger = CancellationLedger::default();
        let first = ledger.register(Some("io"));
        let second = ledger.register(Some("io"));
        let other = ledger.register(Some("timer"));

        ledger.cancel_all("io");

        assert!(first.token.is_cancelled());
        assert!(second.token.is_cancelled());
        assert!(!other.token.is_cancelled());
        assert_eq!(ledger.outstanding(), 1);
    }

    #[test]
    fn cancel_all_on_absent_id_is_noop() {
        let ledger = CancellationLedger::default();
        ledger.cancel_all("nothing-here");
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn cancel_all_skips_anonymous_bucket() {
        let ledger = CancellationLedger::default();
        let anonymous = ledger.register(None);

        ledger.cancel_all("io");
        assert!(!anonymous.token.is_cancelled());
    }

    #[test]
    fn stale_unregister_never_removes_successor() {
        let ledger = CancellationLedger::default();
        let first = ledger.register(Some("io"));
        ledger.cancel_all("io");
        let second = ledger.register(Some("io"));

        // the cancelled task unregisters late
        ledger.unregister(&first.bucket, first.handle);

        assert_eq!(ledger.outstanding(), 1);
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn cancel_everything_includes_anonymous_handles() {
        let ledger = CancellationLedger::default();
        let named = ledger.register(Some("io"));
        let anonymous = ledger.register(None);

        ledger.cancel_everything();

        assert!(named.token.is_cancelled());
        assert!(anonymous.token.is_cancelled());
        assert_eq!(ledger.outstanding(), 0);
    }
}
