// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::checksum::Checksum;
use crate::entry::{SharedTask, SnapshotResult};
use crate::inner::{CacheMap, Inner};
use crate::metrics::Metrics;
use crate::snapshot::Snapshot;

/// Which of the two cache instances a `ChecksumCache` handle views. Both
/// variants reach into the same `Inner` behind the same mutex; this enum is
/// the only thing that makes them distinct objects.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Branch {
    Any,
    Primary,
}

/// A view over one of the two checksum -> entry maps living inside `Inner`.
/// Cheap to clone (an `Arc` and a two-variant enum), so every `SolutionHandle`
/// can carry its own copy to release itself against on drop.
#[derive(Clone)]
pub(crate) struct ChecksumCache<S: Snapshot> {
    shared: Arc<Mutex<Inner<S>>>,
    branch: Branch,
    metrics: Arc<Metrics>,
}

impl<S: Snapshot> ChecksumCache<S> {
    pub(crate) fn new(shared: Arc<Mutex<Inner<S>>>, branch: Branch, metrics: Arc<Metrics>) -> Self {
        Self {
            shared,
            branch,
            metrics,
        }
    }

    fn map<'a>(&self, inner: &'a mut Inner<S>) -> &'a mut CacheMap<S> {
        match self.branch {
            Branch::Any => &mut inner.any_branch,
            Branch::Primary => &mut inner.primary_branch,
        }
    }

    fn record_hit(&self) {
        match self.branch {
            Branch::Any => self.metrics.any_branch_hits.inc(),
            Branch::Primary => self.metrics.primary_branch_hits.inc(),
        }
    }

    fn record_miss(&self) {
        match self.branch {
            Branch::Any => self.metrics.any_branch_misses.inc(),
            Branch::Primary => self.metrics.primary_branch_misses.inc(),
        }
    }

    fn record_len(&self, len: usize) {
        let gauge = match self.branch {
            Branch::Any => &self.metrics.any_branch_entries,
            Branch::Primary => &self.metrics.primary_branch_entries,
        };
        gauge.set(len as i64);
    }

    /// `TryFastGet` followed by `SlowGetOrCreate` on a miss: the get-or-create
    /// step from §4.1(b)/(c). `make_producer` is only invoked if no entry for
    /// `checksum` exists yet.
    pub(crate) fn acquire(
        &self,
        checksum: Checksum,
        make_producer: impl FnOnce(CancellationToken) -> BoxFuture<'static, SnapshotResult<S>>,
    ) -> SolutionHandle<S> {
        let mut guard = self.shared.lock();
        let map = self.map(&mut guard);
        let (task, generation) = match map.try_fast_get(checksum) {
            Some(hit) => {
                drop(guard);
                self.record_hit();
                hit
            }
            None => {
                let (task, generation, created) = map.slow_get_or_create(checksum, make_producer);
                let len = map.len();
                drop(guard);
                if created {
                    self.record_miss();
                } else {
                    // Another caller installed the entry between our fast-get
                    // miss and taking the lock for slow-get-or-create.
                    self.record_hit();
                }
                self.record_len(len);
                (task, generation)
            }
        };
        SolutionHandle {
            checksum,
            generation,
            task,
            cache: self.clone(),
            released: false,
        }
    }

    /// `SetLastRequested`. Must not hold the lock while releasing the prior
    /// pin: that release can drain the prior entry to zero and run its
    /// cleanup, which re-locks this same mutex.
    pub(crate) fn set_last_requested(&self, checksum: Checksum, generation: u64) {
        let prior = {
            let mut guard = self.shared.lock();
            self.map(&mut guard).set_last_requested(checksum, generation)
        };
        if let Some((prior_checksum, prior_generation)) = prior {
            self.release(prior_checksum, prior_generation);
        }
    }

    pub(crate) fn release(&self, checksum: Checksum, generation: u64) {
        let mut guard = self.shared.lock();
        let map = self.map(&mut guard);
        map.release(checksum, generation);
        let len = map.len();
        drop(guard);
        self.record_len(len);
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        let mut guard = self.shared.lock();
        self.map(&mut guard).len()
    }
}

/// RAII reference to one `RefCountedLazySolution`. Dropping it releases the
/// reference it was constructed with; `snapshot()` awaits the shared
/// materialization task. This is the idiomatic-Rust shape of the
/// "value with a manual `release` method" the design notes call for: the
/// manual method is `Drop::drop`, so forgetting to release is a compile-time
/// impossibility rather than a caller discipline problem.
pub(crate) struct SolutionHandle<S: Snapshot> {
    checksum: Checksum,
    generation: u64,
    task: SharedTask<S>,
    cache: ChecksumCache<S>,
    released: bool,
}

impl<S: Snapshot> SolutionHandle<S> {
    pub(crate) fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) async fn snapshot(&self) -> SnapshotResult<S> {
        self.task.clone().await
    }

    /// A clone of the underlying shared task, for a dependent entry (e.g. a
    /// primary-branch promotion) that needs to await the same materialization
    /// without taking its own reference to it.
    pub(crate) fn task_clone(&self) -> SharedTask<S> {
        self.task.clone()
    }

    /// Pins this handle's entry into the owning cache's `last_requested`
    /// slot. Takes an independent, additional reference -- this handle's own
    /// reference is unaffected and still released normally on drop.
    pub(crate) fn pin_as_last_requested(&self) {
        self.cache.set_last_requested(self.checksum, self.generation);
    }

    /// Releases early instead of waiting for `Drop`, useful when a caller
    /// wants to be explicit about where the reference ends.
    #[cfg(test)]
    pub(crate) fn release_now(mut self) {
        self.cache.release(self.checksum, self.generation);
        self.released = true;
    }
}

impl<S: Snapshot> Drop for SolutionHandle<S> {
    fn drop(&mut self) {
        if !self.released {
            self.cache.release(self.checksum, self.generation);
        }
    }
}
