// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Branch, ChecksumCache};
use crate::checksum::Checksum;
use crate::compute::compute_snapshot;
use crate::context::Context;
use crate::error::CacheError;
use crate::inner::Inner;
use crate::interfaces::{AssetProvider, SolutionUpdater, WorkspaceHost};
use crate::snapshot::Snapshot;

/// Public façade over the cache. Holds the current primary snapshot, its
/// monotonic version, and both branch caches, all reached through one
/// `parking_lot::Mutex<Inner<S>>` -- see `SPEC_FULL.md` for why a single
/// combined lock rather than one per component.
///
/// Cheap to clone: every field is an `Arc` (or, for `context`, a struct of
/// `Arc`s), which is what lets a promotion's producer capture its own
/// `Workspace` handle to call back into `promote` once the any-branch
/// materialization resolves.
pub struct Workspace<S: Snapshot> {
    shared: Arc<Mutex<Inner<S>>>,
    host: Arc<dyn WorkspaceHost<S>>,
    context: Context,
}

impl<S: Snapshot> Clone for Workspace<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            host: self.host.clone(),
            context: self.context.clone(),
        }
    }
}

impl<S: Snapshot> Workspace<S> {
    pub fn new(host: Arc<dyn WorkspaceHost<S>>, context: Context) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Inner::new())),
            host,
            context,
        }
    }

    fn any_branch(&self) -> ChecksumCache<S> {
        ChecksumCache::new(self.shared.clone(), Branch::Any, self.context.metrics.clone())
    }

    fn primary_branch(&self) -> ChecksumCache<S> {
        ChecksumCache::new(
            self.shared.clone(),
            Branch::Primary,
            self.context.metrics.clone(),
        )
    }

    /// The workspace's current primary snapshot, if any has been promoted
    /// yet.
    pub fn current_snapshot(&self) -> Option<Arc<S>> {
        self.shared.lock().current_snapshot.clone()
    }

    /// The workspace's current monotonic version. Starts below any legal
    /// version, so the first promotion always succeeds.
    pub fn current_version(&self) -> i64 {
        self.shared.lock().current_version
    }

    /// Operation (1): obtains (or reuses) the snapshot for `checksum` and
    /// runs `implementation` against it. Does not touch the primary branch.
    pub async fn run_with_solution<F, Fut, R>(
        &self,
        assets: Arc<dyn AssetProvider>,
        updater: Arc<dyn SolutionUpdater<S>>,
        checksum: Checksum,
        implementation: F,
    ) -> Result<(Arc<S>, R), Arc<CacheError>>
    where
        F: FnOnce(Arc<S>) -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        self.internal_run_with_solution(assets, updater, checksum, None, implementation)
            .await
    }

    /// Operation (2): like `run_with_solution`, but additionally promotes
    /// the resulting snapshot to primary provided `version` exceeds the
    /// workspace's current version.
    pub async fn run_with_solution_and_promote<F, Fut, R>(
        &self,
        assets: Arc<dyn AssetProvider>,
        updater: Arc<dyn SolutionUpdater<S>>,
        checksum: Checksum,
        version: i64,
        implementation: F,
    ) -> Result<(Arc<S>, R), Arc<CacheError>>
    where
        F: FnOnce(Arc<S>) -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        self.internal_run_with_solution(assets, updater, checksum, Some(version), implementation)
            .await
    }

    /// Operation (3): `run_with_solution_and_promote` with a no-op
    /// implementation.
    pub async fn update_primary_branch(
        &self,
        assets: Arc<dyn AssetProvider>,
        updater: Arc<dyn SolutionUpdater<S>>,
        checksum: Checksum,
        version: i64,
    ) -> Result<(), Arc<CacheError>> {
        self.run_with_solution_and_promote(assets, updater, checksum, version, |_snapshot| async {})
            .await?;
        Ok(())
    }

    /// The get-or-create algorithm from §4.1, shared by all three public
    /// operations. Not part of the production contract by itself -- it's
    /// `pub(crate)` so the scenario tests under `src/tests/` can drive it
    /// directly, the same way the design calls for an `internalRunWithSolution`
    /// test surface distinct from the public API.
    pub(crate) async fn internal_run_with_solution<F, Fut, R>(
        &self,
        assets: Arc<dyn AssetProvider>,
        updater: Arc<dyn SolutionUpdater<S>>,
        checksum: Checksum,
        promote: Option<i64>,
        implementation: F,
    ) -> Result<(Arc<S>, R), Arc<CacheError>>
    where
        F: FnOnce(Arc<S>) -> Fut + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
    {
        // §4.1(a): a promoting call whose checksum already matches the
        // current primary short-circuits entirely -- no cache lookup, no
        // reference taken, no version check.
        if promote.is_some() {
            let current = {
                let inner = self.shared.lock();
                (inner.current_checksum == Some(checksum))
                    .then(|| inner.current_snapshot.clone())
                    .flatten()
            };
            if let Some(current) = current {
                let result = implementation(current.clone()).await;
                return Ok((current, result));
            }
        }

        // §4.1(b)/(c): get-or-create on the any-branch cache. Every caller
        // goes through here, promoting or not, so concurrent requests for
        // the same checksum always collapse onto the same materialization.
        let any_branch = self.any_branch();
        let any_handle = {
            let shared = self.shared.clone();
            let assets = assets.clone();
            let updater = updater.clone();
            let metrics = self.context.metrics.clone();
            any_branch.acquire(checksum, move |cancel| {
                Box::pin(compute_snapshot(
                    async move { shared.lock().current_snapshot.clone() },
                    assets,
                    updater,
                    checksum,
                    cancel,
                    metrics,
                ))
            })
        };

        let (primary_handle, snapshot) = if let Some(version) = promote {
            // §4.1(e): the primary-branch entry's producer does not
            // re-materialize; it awaits the any-branch entry's task and
            // promotes whatever that resolves to.
            let primary_branch = self.primary_branch();
            let any_task = any_handle.task_clone();
            let workspace = self.clone();
            let primary_handle = primary_branch.acquire(checksum, move |cancel| {
                Box::pin(async move {
                    // Race the any-branch task against this entry's own
                    // cancellation: if every caller of *this* promotion drops
                    // its reference before the any-branch materialization
                    // resolves, stop waiting and skip the promotion rather
                    // than applying it to a workspace nobody is watching
                    // anymore.
                    let snapshot = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Arc::new(CacheError::Cancelled)),
                        result = any_task => result?,
                    };
                    let (effective, _updated) = workspace.promote(checksum, version, snapshot);
                    Ok(effective)
                })
            });
            let snapshot = primary_handle.snapshot().await?;
            (Some(primary_handle), snapshot)
        } else {
            let snapshot = any_handle.snapshot().await?;
            (None, snapshot)
        };

        let result = implementation(snapshot.clone()).await;

        // §4.1(f): pin the hottest entries before this call's own references
        // are released.
        any_handle.pin_as_last_requested();
        if let Some(primary_handle) = &primary_handle {
            primary_handle.pin_as_last_requested();
        }
        // §4.1(g): `any_handle` and `primary_handle` release the caller's
        // own references when they drop at the end of this scope.

        Ok((snapshot, result))
    }

    /// `TryUpdateCurrentSolution` (§4.2), reachable from tests exactly as
    /// named in the test-access façade (§6): `(version, snapshot) -> (Arc<S>, bool)`.
    /// Does not touch `current_checksum` bookkeeping, which is a production-
    /// path-only optimization for the §4.1(a) fast path.
    #[cfg(test)]
    pub(crate) fn try_update_current_solution(
        &self,
        version: i64,
        new_snapshot: Arc<S>,
    ) -> (Arc<S>, bool) {
        self.apply_promotion(None, version, new_snapshot)
    }

    /// The production promotion path: same contract as
    /// `try_update_current_solution`, but also records which checksum the
    /// installed snapshot came from, so a later promoting call for the same
    /// checksum can take the §4.1(a) fast path.
    fn promote(&self, checksum: Checksum, version: i64, new_snapshot: Arc<S>) -> (Arc<S>, bool) {
        self.apply_promotion(Some(checksum), version, new_snapshot)
    }

    fn apply_promotion(
        &self,
        checksum: Option<Checksum>,
        version: i64,
        new_snapshot: Arc<S>,
    ) -> (Arc<S>, bool) {
        let mut inner = self.shared.lock();
        if version <= inner.current_version {
            self.context.metrics.promotions_rejected.inc();
            return (new_snapshot, false);
        }
        inner.current_version = version;
        if let Some(checksum) = checksum {
            inner.current_checksum = Some(checksum);
        }

        let changed_identity = match &inner.current_snapshot {
            Some(current) => {
                current.solution_id() != new_snapshot.solution_id()
                    || current.primary_file_path() != new_snapshot.primary_file_path()
            }
            None => true,
        };

        inner.current_snapshot = Some(new_snapshot.clone());
        // The host callbacks run while still holding the lock: they must be
        // cheap and non-reentrant (see `WorkspaceHost`'s doc comment).
        if changed_identity {
            self.host.clear_solution_data();
            self.host.on_solution_added(&new_snapshot);
        } else {
            self.host.on_solution_changed(&new_snapshot);
        }
        self.context.metrics.promotions_applied.inc();
        (new_snapshot, true)
    }

    #[cfg(test)]
    pub(crate) fn any_branch_entry_count(&self) -> usize {
        self.any_branch().entry_count()
    }

    #[cfg(test)]
    pub(crate) fn primary_branch_entry_count(&self) -> usize {
        self.primary_branch().entry_count()
    }
}
