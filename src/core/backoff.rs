// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Retry wrapper for remote store calls.
//!
//! Transient transport failures are retried with exponential backoff; every
//! other error is returned on the first attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::StoreError;
use crate::core::report::Reporter;
use crate::core::CollectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Total attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(300),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay applied after `failures` earlier consecutive failures:
    /// `min(initial * 2^failures, max)`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Runs store operations under a [`BackoffPolicy`], reporting each retry.
#[derive(Clone)]
pub struct RequestExecutor {
    policy: BackoffPolicy,
    reporter: Arc<dyn Reporter>,
}

impl RequestExecutor {
    pub fn new(policy: BackoffPolicy, reporter: Arc<dyn Reporter>) -> Self {
        Self { policy, reporter }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, CollectionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempts = 0u32;

        loop {
            debug!(operation, attempt = attempts + 1, "Store request");
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() => {
                    attempts += 1;
                    self.reporter.warning(&format!(
                        "Request for {} failed with: {}",
                        operation, e
                    ));

                    if !self.policy.allows(attempts) {
                        return Err(CollectionError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts,
                            source: e,
                        });
                    }
                    tokio::time::sleep(self.policy.delay_for(attempts - 1)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
