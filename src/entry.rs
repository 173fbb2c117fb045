// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;
use crate::snapshot::Snapshot;

/// What every holder of a `RefCountedLazySolution` ultimately awaits. Wrapped
/// in `Arc` on both sides of the `Result` so the type is cheap to `Clone`,
/// which `Shared` requires, and so every awaiter observes the identical
/// `Snapshot` object (`Arc::ptr_eq`), matching the "same object identity"
/// requirement for collapsed concurrent requests.
pub(crate) type SnapshotResult<S> = Result<Arc<S>, Arc<CacheError>>;
pub(crate) type SharedTask<S> = Shared<BoxFuture<'static, SnapshotResult<S>>>;

/// One materialization attempt: eagerly started, reference-counted,
/// cancelled when its last reference is released.
///
/// Invariants (enforced by its owning `CacheMap`, which is the only thing
/// that ever touches `ref_count`): constructed with `ref_count == 1`;
/// mutated only while the shared mutex is held; once it reaches zero the
/// entry is removed from its map and its `cancel` token is fired exactly
/// once. There is no way back from zero.
pub(crate) struct Entry<S: Snapshot> {
    /// Tags this entry so a stale `(Checksum, generation)` handle -- one
    /// whose entry has already been cleaned up and possibly replaced by a
    /// fresh materialization for the same checksum -- can be told apart from
    /// the current occupant. This is the ABA guard the design calls for,
    /// expressed as a counter instead of a pointer comparison.
    pub(crate) generation: u64,
    pub(crate) task: SharedTask<S>,
    pub(crate) cancel: CancellationToken,
    pub(crate) ref_count: usize,
}

impl<S: Snapshot> Entry<S> {
    pub(crate) fn new(
        generation: u64,
        cancel: CancellationToken,
        producer: impl Future<Output = SnapshotResult<S>> + Send + 'static,
    ) -> Self {
        Self {
            generation,
            task: spawn_producer(producer),
            cancel,
            ref_count: 1,
        }
    }
}

/// Schedules `producer` on the executor immediately (so waiters never
/// contend on a "start" latch) and wraps it so every clone of the returned
/// `Shared` future observes the same result. A panic inside the producer is
/// propagated to every awaiter rather than silently swallowed, mirroring
/// `commit_syncer.rs`'s `std::panic::resume_unwind` handling of its own
/// background tasks.
fn spawn_producer<S: Snapshot>(
    producer: impl Future<Output = SnapshotResult<S>> + Send + 'static,
) -> SharedTask<S> {
    let handle = tokio::spawn(producer);
    async move {
        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                if join_err.is_panic() {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                // The task was aborted; to any remaining awaiter this looks
                // exactly like the materialization having been cancelled.
                Err(Arc::new(CacheError::Cancelled))
            }
        }
    }
    .boxed()
    .shared()
}
