// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

/// Identity of a solution, as distinct from the [`crate::Checksum`] that was
/// used to request it: two checksums can legitimately materialize into
/// snapshots that describe the same logical solution (e.g. an incremental
/// rebase that changed no project shape), and `TryUpdateCurrentSolution`
/// cares about that distinction when deciding which change event to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolutionId(pub u64);

/// An immutable view of project/file state, produced by an external solution
/// builder. The solution data structure itself is out of scope for this
/// crate: callers provide a type that implements this trait, and the cache
/// only ever clones the resulting `Arc<S>` around, never inspects its
/// contents beyond the two properties below.
pub trait Snapshot: Send + Sync + 'static {
    /// Identity of the solution this snapshot represents.
    fn solution_id(&self) -> SolutionId;

    /// Path of the primary project/file the solution is rooted at, if any.
    fn primary_file_path(&self) -> Option<&Path>;
}
