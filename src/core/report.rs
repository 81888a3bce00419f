// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use tracing::{info, warn};

/// Sink for user-facing success, notice and warning messages.
pub trait Reporter: Send + Sync {
    fn success(&self, message: &str);
    fn notice(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn success(&self, message: &str) {
        info!(kind = "success", "{}", message);
    }

    fn notice(&self, message: &str) {
        info!(kind = "notice", "{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}
