// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Failures a materialization, or a caller waiting on one, can observe.
///
/// `Cancelled` is the only kind callers are expected to recover from locally:
/// it means *this* caller's own wait was cancelled, not that the underlying
/// materialization failed for everyone. The other two surface to every
/// awaiter of the failed materialization and are reported through the
/// fatal-error sink (`tracing::error!` plus [`crate::Metrics::materializations_failed`])
/// before being re-raised.
///
/// Programming bugs (incrementing a drained entry's reference count, a
/// version regression slipping past the monotonicity check) are not
/// represented here: per the error-handling design, those fail fast via
/// `panic!`/`debug_assert!` rather than as a recoverable variant.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("materialization cancelled")]
    Cancelled,

    #[error("failed to synchronize solution assets: {0}")]
    AssetFetchFailed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("failed to build solution snapshot: {0}")]
    SolutionBuildFailed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl CacheError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CacheError::Cancelled)
    }
}
