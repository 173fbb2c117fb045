// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::checksum::Checksum;
use crate::error::CacheError;
use crate::snapshot::Snapshot;

/// Fetches and validates asset bytes (source files, project metadata, ...)
/// for a checksum from the remote host. The wire format and transport are
/// entirely this trait's business; the cache only calls it in the order
/// `ComputeSnapshot` needs.
#[async_trait]
pub trait AssetProvider: Send + Sync + 'static {
    async fn synchronize_solution_assets(
        &self,
        checksum: Checksum,
        cancel: CancellationToken,
    ) -> Result<(), CacheError>;

    async fn create_solution_info(
        &self,
        checksum: Checksum,
        cancel: CancellationToken,
    ) -> Result<SolutionInfo, CacheError>;
}

/// Builds snapshots, either by rebasing the workspace's current primary
/// snapshot onto a new checksum (cheap, when possible) or from scratch out
/// of a [`SolutionInfo`] (expensive, always correct).
#[async_trait]
pub trait SolutionUpdater<S: Snapshot>: Send + Sync + 'static {
    /// Whether `checksum` can be reached from `current` by an incremental
    /// rebase rather than a full rebuild.
    async fn is_incremental_update(
        &self,
        checksum: Checksum,
        cancel: CancellationToken,
    ) -> Result<bool, CacheError>;

    async fn create_incremental_solution(
        &self,
        current: Arc<S>,
        checksum: Checksum,
        cancel: CancellationToken,
    ) -> Result<Arc<S>, CacheError>;

    /// Reconstructs a fresh snapshot by creating the base solution and
    /// adding each project described by `info`.
    async fn create_full_solution(
        &self,
        info: SolutionInfo,
        cancel: CancellationToken,
    ) -> Result<Arc<S>, CacheError>;
}

/// Sink for workspace-change notifications. Implementations must be cheap
/// and non-blocking: these methods are called while the cache's shared
/// mutex is held (see `Workspace::try_update_current_solution`), so they
/// should do nothing more than enqueue the notification for the embedding
/// host to observe later, never re-enter the cache.
pub trait WorkspaceHost<S: Snapshot>: Send + Sync + 'static {
    fn on_solution_added(&self, snapshot: &Arc<S>);
    fn on_solution_changed(&self, snapshot: &Arc<S>);
    fn clear_solution_data(&self);
}

/// Opaque bag of project descriptors an [`AssetProvider`] hands back after a
/// bulk sync, consumed by [`SolutionUpdater::create_full_solution`].
#[derive(Debug, Clone, Default)]
pub struct SolutionInfo {
    pub projects: Vec<ProjectInfo>,
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub id: ProjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectId(pub u64);
