// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scenario tests for the quantified properties and seed tests in §8 of
//! `SPEC_FULL.md`, one file per scenario group, mirroring the reference
//! crate's `src/tests/*.rs` layout (`base_committer_tests.rs`,
//! `future_flooding_test.rs`, ...).

mod last_requested;

/// Installs a `tracing` subscriber for the duration of the test process, so
/// `debug!`/`error!` calls in `compute.rs` and elsewhere are visible with
/// `--nocapture`. Safe to call from every test: only the first call wins.
pub(crate) fn init_tracing_for_tests() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
