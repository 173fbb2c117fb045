// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{IntCounter, IntGauge, Registry};

/// Metrics for the solution cache, registered against a `Registry` supplied
/// by the embedding host. None of these counters gate behavior; they exist
/// purely for observability, the same way `consensus-core`'s `node_metrics`
/// do for the consensus engine.
pub struct Metrics {
    pub materializations_started: IntCounter,
    pub materializations_cancelled: IntCounter,
    pub materializations_failed: IntCounter,
    pub any_branch_hits: IntCounter,
    pub any_branch_misses: IntCounter,
    pub primary_branch_hits: IntCounter,
    pub primary_branch_misses: IntCounter,
    pub promotions_applied: IntCounter,
    pub promotions_rejected: IntCounter,
    pub any_branch_entries: IntGauge,
    pub primary_branch_entries: IntGauge,
}

impl Metrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let metrics = Self {
            materializations_started: IntCounter::new(
                "solution_cache_materializations_started",
                "Number of solution materializations started",
            )?,
            materializations_cancelled: IntCounter::new(
                "solution_cache_materializations_cancelled",
                "Number of solution materializations cancelled because their last reference was dropped",
            )?,
            materializations_failed: IntCounter::new(
                "solution_cache_materializations_failed",
                "Number of solution materializations that failed with a non-cancellation error",
            )?,
            any_branch_hits: IntCounter::new(
                "solution_cache_any_branch_hits",
                "Number of any-branch cache lookups that reused an existing entry",
            )?,
            any_branch_misses: IntCounter::new(
                "solution_cache_any_branch_misses",
                "Number of any-branch cache lookups that started a new materialization",
            )?,
            primary_branch_hits: IntCounter::new(
                "solution_cache_primary_branch_hits",
                "Number of primary-branch cache lookups that reused an existing entry",
            )?,
            primary_branch_misses: IntCounter::new(
                "solution_cache_primary_branch_misses",
                "Number of primary-branch cache lookups that started a new promotion",
            )?,
            promotions_applied: IntCounter::new(
                "solution_cache_promotions_applied",
                "Number of promotions that advanced the workspace's current version",
            )?,
            promotions_rejected: IntCounter::new(
                "solution_cache_promotions_rejected",
                "Number of promotions rejected because their version did not exceed the current one",
            )?,
            any_branch_entries: IntGauge::new(
                "solution_cache_any_branch_entries",
                "Live entries in the any-branch cache",
            )?,
            primary_branch_entries: IntGauge::new(
                "solution_cache_primary_branch_entries",
                "Live entries in the primary-branch cache",
            )?,
        };

        registry.register(Box::new(metrics.materializations_started.clone()))?;
        registry.register(Box::new(metrics.materializations_cancelled.clone()))?;
        registry.register(Box::new(metrics.materializations_failed.clone()))?;
        registry.register(Box::new(metrics.any_branch_hits.clone()))?;
        registry.register(Box::new(metrics.any_branch_misses.clone()))?;
        registry.register(Box::new(metrics.primary_branch_hits.clone()))?;
        registry.register(Box::new(metrics.primary_branch_misses.clone()))?;
        registry.register(Box::new(metrics.promotions_applied.clone()))?;
        registry.register(Box::new(metrics.promotions_rejected.clone()))?;
        registry.register(Box::new(metrics.any_branch_entries.clone()))?;
        registry.register(Box::new(metrics.primary_branch_entries.clone()))?;

        Ok(metrics)
    }

    /// A `Metrics` instance that isn't wired up to any registry, for tests
    /// that don't care about observability.
    #[cfg(test)]
    pub(crate) fn for_test() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new(&Registry::new()).expect("metric names don't collide"))
    }
}
