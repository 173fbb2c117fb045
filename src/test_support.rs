// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic collaborators for the scenario tests under `src/tests/`: a fake
//! `AssetProvider` / `SolutionUpdater` / `WorkspaceHost` plus a `FakeSnapshot`,
//! in the spirit of `test_dag_builder.rs`'s role for the consensus tests.
//! None of this talks to real I/O; latency and failure are both dialable so
//! tests can put a materialization exactly where they need it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::checksum::Checksum;
use crate::error::CacheError;
use crate::interfaces::{AssetProvider, ProjectId, ProjectInfo, SolutionInfo, WorkspaceHost};
use crate::snapshot::{Snapshot, SolutionId};

pub(crate) fn checksum(tag: u8) -> Checksum {
    let mut bytes = [0u8; 32];
    bytes[0] = tag;
    Checksum::new(bytes)
}

/// A snapshot whose identity is whatever the test says it is, so
/// `TryUpdateCurrentSolution`'s "added" vs "changed" branch is directly
/// controllable from a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeSnapshot {
    pub(crate) solution_id: SolutionId,
    pub(crate) primary_file_path: Option<PathBuf>,
    pub(crate) built_from: Checksum,
}

impl FakeSnapshot {
    pub(crate) fn new(solution_id: u64, checksum: Checksum) -> Self {
        Self {
            solution_id: SolutionId(solution_id),
            primary_file_path: Some(PathBuf::from("/root/Solution.sln")),
            built_from: checksum,
        }
    }
}

impl Snapshot for FakeSnapshot {
    fn solution_id(&self) -> SolutionId {
        self.solution_id
    }

    fn primary_file_path(&self) -> Option<&Path> {
        self.primary_file_path.as_deref()
    }
}

/// Counts calls and optionally sleeps/fails, so tests can assert "exactly one
/// producer ran" (§8) and exercise the cancellation and failure paths.
pub(crate) struct FakeAssetProvider {
    pub(crate) sync_calls: AtomicUsize,
    pub(crate) info_calls: AtomicUsize,
    pub(crate) sync_delay: Duration,
    pub(crate) fail_sync: bool,
}

impl FakeAssetProvider {
    pub(crate) fn new() -> Self {
        Self {
            sync_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            sync_delay: Duration::ZERO,
            fail_sync: false,
        }
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            sync_delay: delay,
            ..Self::new()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_sync: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl AssetProvider for FakeAssetProvider {
    async fn synchronize_solution_assets(
        &self,
        _checksum: Checksum,
        _cancel: CancellationToken,
    ) -> Result<(), CacheError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        if !self.sync_delay.is_zero() {
            tokio::time::sleep(self.sync_delay).await;
        }
        if self.fail_sync {
            return Err(CacheError::AssetFetchFailed("synthetic sync failure".into()));
        }
        Ok(())
    }

    async fn create_solution_info(
        &self,
        checksum: Checksum,
        _cancel: CancellationToken,
    ) -> Result<SolutionInfo, CacheError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SolutionInfo {
            projects: vec![ProjectInfo {
                id: ProjectId(checksum.as_bytes()[0] as u64),
            }],
        })
    }
}

/// Always reports "not incremental" unless told otherwise, and builds a
/// `FakeSnapshot` whose identity is derived from the checksum bytes, so two
/// different checksums produce two different `solution_id`s by default.
pub(crate) struct FakeSolutionUpdater {
    pub(crate) build_calls: AtomicUsize,
    pub(crate) incremental_eligible: bool,
    pub(crate) build_delay: Duration,
}

impl FakeSolutionUpdater {
    pub(crate) fn new() -> Self {
        Self {
            build_calls: AtomicUsize::new(0),
            incremental_eligible: false,
            build_delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            build_delay: delay,
            ..Self::new()
        }
    }
}

#[async_trait]
impl crate::interfaces::SolutionUpdater<FakeSnapshot> for FakeSolutionUpdater {
    async fn is_incremental_update(
        &self,
        _checksum: Checksum,
        _cancel: CancellationToken,
    ) -> Result<bool, CacheError> {
        Ok(self.incremental_eligible)
    }

    async fn create_incremental_solution(
        &self,
        current: Arc<FakeSnapshot>,
        checksum: Checksum,
        _cancel: CancellationToken,
    ) -> Result<Arc<FakeSnapshot>, CacheError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSnapshot {
            built_from: checksum,
            ..(*current).clone()
        }))
    }

    async fn create_full_solution(
        &self,
        info: SolutionInfo,
        _cancel: CancellationToken,
    ) -> Result<Arc<FakeSnapshot>, CacheError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }
        let seed = info.projects.first().map(|p| p.id.0).unwrap_or(0);
        Ok(Arc::new(FakeSnapshot::new(seed, checksum(seed as u8))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostEvent {
    Added,
    Changed,
    Cleared,
}

/// Records every notification in order so tests can assert on the "added" vs
/// "changed" distinction from `TryUpdateCurrentSolution`.
#[derive(Default)]
pub(crate) struct FakeWorkspaceHost {
    events: Mutex<Vec<HostEvent>>,
    next_id: AtomicU64,
}

impl FakeWorkspaceHost {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }
}

impl WorkspaceHost<FakeSnapshot> for FakeWorkspaceHost {
    fn on_solution_added(&self, _snapshot: &Arc<FakeSnapshot>) {
        self.next_id.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(HostEvent::Added);
    }

    fn on_solution_changed(&self, _snapshot: &Arc<FakeSnapshot>) {
        self.events.lock().push(HostEvent::Changed);
    }

    fn clear_solution_data(&self) {
        self.events.lock().push(HostEvent::Cleared);
    }
}
