// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use prometheus::Registry;

use crate::metrics::Metrics;

/// Configuration the cache allows tuning. Deliberately tiny: the design
/// explicitly excludes admission control and explicit size bounds, so there
/// is nothing to configure beyond labeling.
#[derive(Debug, Clone)]
pub struct CacheParameters {
    /// Label attached to materialization tracing spans and the background
    /// task name, useful when a host embeds more than one workspace.
    pub materialization_task_name: String,
}

impl Default for CacheParameters {
    fn default() -> Self {
        Self {
            materialization_task_name: "solution-materialization".to_string(),
        }
    }
}

/// Bundles configuration and metrics shared by every component of the cache.
/// Cheap to clone: it only holds an `Arc<Metrics>` and a small config struct.
#[derive(Clone)]
pub struct Context {
    pub parameters: CacheParameters,
    pub metrics: Arc<Metrics>,
}

impl Context {
    pub fn new(parameters: CacheParameters, registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            parameters,
            metrics: Arc::new(Metrics::new(registry)?),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test() -> Self {
        Self {
            parameters: CacheParameters::default(),
            metrics: Metrics::for_test(),
        }
    }
}
