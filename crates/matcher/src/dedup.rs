use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Process-local best-effort de-duplicator for `coreHash`es currently
/// sitting in the queue (spec §4.F). Correctness never depends on this set:
/// `Storage`'s `coreHash` uniqueness constraint is the real guarantee
/// against double-processing, so a transient duplicate enqueue here is a
/// wasted `Find` call, not a correctness bug.
///
/// Bounded with an approximate LRU policy: once the set exceeds `max`
/// entries, it is trimmed back down to `retain` by dropping the
/// least-recently-inserted entries first. A plain mutex + `HashSet` +
/// insertion-order `VecDeque`, per the "mixed writes" discipline named in
/// the design notes — no need for a lock-free map here.
#[derive(Debug)]
pub(crate) struct DedupSet {
    inner: Mutex<Inner>,
    max: usize,
    retain: usize,
}

#[derive(Debug, Default)]
struct Inner {
    set: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupSet {
    pub(crate) fn new(max: usize, retain: usize) -> Self {
        Self { inner: Mutex::new(Inner::default()), max, retain }
    }

    /// Insert `core_hash` if absent. Returns `true` if it was newly
    /// inserted (the caller should enqueue it), `false` if already queued.
    pub(crate) fn insert(&self, core_hash: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.set.contains(core_hash) {
            return false;
        }
        inner.set.insert(core_hash.to_owned());
        inner.order.push_back(core_hash.to_owned());

        if inner.set.len() > self.max {
            let drop_count = inner.order.len().saturating_sub(self.retain);
            for _ in 0..drop_count {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.set.remove(&oldest);
                }
            }
        }
        true
    }

    /// Remove `core_hash` so a later refill may re-enqueue it — used when a
    /// consumer leaves a transfer `PENDING` (timeout, fetch error, storage
    /// error) rather than reaching a terminal state.
    pub(crate) fn remove(&self, core_hash: &str) {
        self.inner.lock().set.remove(core_hash);
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_is_rejected() {
        let set = DedupSet::new(10_000, 5_000);
        assert!(set.insert("0xabc"));
        assert!(!set.insert("0xabc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn removed_hash_can_be_reinserted() {
        let set = DedupSet::new(10_000, 5_000);
        assert!(set.insert("0xabc"));
        set.remove("0xabc");
        assert!(set.insert("0xabc"));
    }

    #[test]
    fn overflow_trims_down_to_retain_size() {
        let set = DedupSet::new(4, 2);
        for i in 0..5 {
            set.insert(&format!("0x{i}"));
        }
        assert_eq!(set.len(), 2);
        // The most recently inserted entries survive the trim, not the oldest.
        assert!(!set.insert("0x3"));
        assert!(!set.insert("0x4"));
        assert!(set.insert("0x0"));
    }
}
