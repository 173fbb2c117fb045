// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::checksum::Checksum;
use crate::entry::SnapshotResult;
use crate::error::CacheError;
use crate::interfaces::{AssetProvider, SolutionUpdater};
use crate::metrics::Metrics;
use crate::snapshot::Snapshot;

/// Races `fut` against `cancel`, so a materialization stops waiting on
/// external I/O the instant its last reference is dropped instead of only
/// checking cancellation between steps.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, CacheError>>,
) -> SnapshotResult2<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Arc::new(CacheError::Cancelled)),
        result = fut => result.map_err(Arc::new),
    }
}

// A small alias so `cancellable` reads naturally for both `Arc<S>` and
// intermediate results (`bool`, `SolutionInfo`) it's used for below.
type SnapshotResult2<T> = Result<T, Arc<CacheError>>;

/// The `ComputeSnapshot` producer (§4.4): tries an incremental rebase of the
/// workspace's current primary snapshot first, falling back to a bulk asset
/// sync and full rebuild. Runs entirely outside the shared mutex; the one
/// place it needs the current snapshot, it takes the lock just long enough
/// to clone an `Arc`.
pub(crate) async fn compute_snapshot<S>(
    current_snapshot: impl Future<Output = Option<Arc<S>>> + Send,
    assets: Arc<dyn AssetProvider>,
    updater: Arc<dyn SolutionUpdater<S>>,
    checksum: Checksum,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
) -> SnapshotResult<S>
where
    S: Snapshot,
{
    metrics.materializations_started.inc();
    let result = compute_snapshot_inner(current_snapshot, assets, updater, checksum, &cancel).await;
    match &result {
        Ok(_) => {}
        Err(e) if e.is_cancelled() => {
            metrics.materializations_cancelled.inc();
            debug!("materialization for checksum {checksum} cancelled");
        }
        Err(e) => {
            metrics.materializations_failed.inc();
            error!("materialization for checksum {checksum} failed: {e}");
        }
    }
    result
}

async fn compute_snapshot_inner<S>(
    current_snapshot: impl Future<Output = Option<Arc<S>>> + Send,
    assets: Arc<dyn AssetProvider>,
    updater: Arc<dyn SolutionUpdater<S>>,
    checksum: Checksum,
    cancel: &CancellationToken,
) -> SnapshotResult<S>
where
    S: Snapshot,
{
    let is_incremental = cancellable(
        cancel,
        updater.is_incremental_update(checksum, cancel.clone()),
    )
    .await?;

    if is_incremental {
        if let Some(current) = current_snapshot.await {
            let snapshot = cancellable(
                cancel,
                updater.create_incremental_solution(current, checksum, cancel.clone()),
            )
            .await?;
            return Ok(snapshot);
        }
        debug!(
            "checksum {checksum} reported incremental-eligible but there is no current snapshot to rebase; falling back to a full sync"
        );
    }

    cancellable(
        cancel,
        assets.synchronize_solution_assets(checksum, cancel.clone()),
    )
    .await?;
    let info = cancellable(cancel, assets.create_solution_info(checksum, cancel.clone())).await?;
    let snapshot = cancellable(cancel, updater.create_full_solution(info, cancel.clone())).await?;
    Ok(snapshot)
}
