// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Remote workspace solution cache.
//!
//! On a remote compute host, feature requests arrive tagged with a content-hash
//! `Checksum` identifying the solution snapshot they should run against. This
//! crate materializes that snapshot at most once per checksum, keeps it alive
//! for as long as any caller (or the one-deep "last requested" pin) needs it,
//! and cancels the materialization the moment nobody does. [`Workspace`] is the
//! façade most callers use; [`cache`] and [`entry`] hold the concurrency
//! machinery that makes it safe to share across many concurrent feature
//! operations.

mod cache;
mod checksum;
mod compute;
mod context;
mod entry;
mod error;
mod inner;
mod interfaces;
mod metrics;
mod snapshot;
mod workspace;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use checksum::Checksum;
pub use context::{CacheParameters, Context};
pub use error::CacheError;
pub use interfaces::{AssetProvider, ProjectId, ProjectInfo, SolutionInfo, SolutionUpdater, WorkspaceHost};
pub use metrics::Metrics;
pub use snapshot::{Snapshot, SolutionId};
pub use workspace::Workspace;
