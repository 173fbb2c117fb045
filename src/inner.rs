// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use crate::checksum::Checksum;
use crate::entry::Entry;
use crate::snapshot::Snapshot;

/// Sentinel below any legal version, so the very first promotion always
/// clears the `version <= current_version` check.
pub(crate) const NO_VERSION: i64 = i64::MIN;

/// Per-branch cache state: the in-flight/active map plus the one-deep
/// "last requested" pin. Two of these live inside `Inner`, one for the
/// any-branch cache and one for the primary-branch cache; both are reached
/// only through the single mutex guarding `Inner`, which is what gives the
/// two caches (and the workspace) one shared serialization domain instead of
/// a lock apiece.
pub(crate) struct CacheMap<S: Snapshot> {
    entries: HashMap<Checksum, Entry<S>>,
    last_requested: Option<(Checksum, u64)>,
    next_generation: u64,
}

impl<S: Snapshot> CacheMap<S> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_requested: None,
            next_generation: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// `TryFastGet`: checks the `last_requested` pin first, then the map.
    /// Bumps and returns the entry's task + generation on a hit.
    pub(crate) fn try_fast_get(
        &mut self,
        checksum: Checksum,
    ) -> Option<(crate::entry::SharedTask<S>, u64)> {
        if let Some((pinned_checksum, pinned_generation)) = self.last_requested {
            if pinned_checksum == checksum {
                if let Some(entry) = self.entries.get_mut(&checksum) {
                    if entry.generation == pinned_generation {
                        entry.ref_count += 1;
                        return Some((entry.task.clone(), entry.generation));
                    }
                }
            }
        }
        let entry = self.entries.get_mut(&checksum)?;
        entry.ref_count += 1;
        Some((entry.task.clone(), entry.generation))
    }

    /// `SlowGetOrCreate`: re-checks the map (a concurrent caller may have
    /// installed an entry between this caller's `try_fast_get` miss and
    /// acquiring the lock again for this call -- in practice both happen
    /// under the same critical section, but the re-check keeps this method
    /// correct if ever called on its own) and otherwise installs a new
    /// entry whose producer was constructed by `make_producer`.
    ///
    /// `make_producer` must not touch this cache's mutex while it *runs* to
    /// construct the future -- only the future's eventual `.await` may lock
    /// it, and only after being handed off to the executor by `Entry::new`.
    pub(crate) fn slow_get_or_create(
        &mut self,
        checksum: Checksum,
        make_producer: impl FnOnce(
            tokio_util::sync::CancellationToken,
        ) -> futures::future::BoxFuture<'static, crate::entry::SnapshotResult<S>>,
    ) -> (crate::entry::SharedTask<S>, u64, bool) {
        if let Some(entry) = self.entries.get_mut(&checksum) {
            entry.ref_count += 1;
            return (entry.task.clone(), entry.generation, false);
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        let cancel = tokio_util::sync::CancellationToken::new();
        let producer = make_producer(cancel.clone());
        let entry = Entry::new(generation, cancel, producer);
        let task = entry.task.clone();
        self.entries.insert(checksum, entry);
        (task, generation, true)
    }

    /// `release`: decrements the entry's reference count; at zero, fires its
    /// cancellation token and removes it from the map. A `(checksum,
    /// generation)` pair whose entry is absent, or present under a
    /// different generation, refers to an already-cleaned-up occupant and is
    /// silently ignored -- this is the ABA guard from the design notes.
    pub(crate) fn release(&mut self, checksum: Checksum, generation: u64) {
        let Some(entry) = self.entries.get_mut(&checksum) else {
            return;
        };
        if entry.generation != generation {
            return;
        }
        debug_assert!(entry.ref_count > 0, "release on an already-drained entry");
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            let entry = self
                .entries
                .remove(&checksum)
                .expect("entry was just found present above");
            entry.cancel.cancel();
        }
    }

    /// `SetLastRequested`: bumps `(checksum, generation)` (if it's still the
    /// current occupant) and swaps it into the pin slot, returning whatever
    /// was pinned before. The caller is responsible for releasing the
    /// returned pair *after* dropping the lock this method was called
    /// under -- releasing it here would re-enter this same critical section
    /// if that release drains the prior pin to zero.
    pub(crate) fn set_last_requested(
        &mut self,
        checksum: Checksum,
        generation: u64,
    ) -> Option<(Checksum, u64)> {
        if let Some(entry) = self.entries.get_mut(&checksum) {
            if entry.generation == generation {
                entry.ref_count += 1;
            }
        }
        std::mem::replace(&mut self.last_requested, Some((checksum, generation)))
    }
}

/// All state reached through the single shared mutex: the workspace's
/// current primary snapshot and version, and both branch caches.
pub(crate) struct Inner<S: Snapshot> {
    pub(crate) current_snapshot: Option<Arc<S>>,
    pub(crate) current_checksum: Option<Checksum>,
    pub(crate) current_version: i64,
    pub(crate) any_branch: CacheMap<S>,
    pub(crate) primary_branch: CacheMap<S>,
}

impl<S: Snapshot> Inner<S> {
    pub(crate) fn new() -> Self {
        Self {
            current_snapshot: None,
            current_checksum: None,
            current_version: NO_VERSION,
            any_branch: CacheMap::new(),
            primary_branch: CacheMap::new(),
        }
    }
}
